//! Property-based tests.

use cms_crypto::{
    algorithms::DigestAlgorithm,
    cms::{ContentInfo, DigestedData},
    content_encryption::{ContentEncryptionAlgorithm, ContentEncryptionParams},
    key_wrap::KeyWrapAlgorithm,
    HasKeySize,
};
use proptest::prelude::*;
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;

fn registered() -> impl Strategy<Value = ContentEncryptionAlgorithm> {
    prop::sample::select(ContentEncryptionAlgorithm::registered().collect::<Vec<_>>())
}

fn pwri_cipher() -> impl Strategy<Value = ContentEncryptionAlgorithm> {
    prop::sample::select(vec![
        ContentEncryptionAlgorithm::AES_128_CBC,
        ContentEncryptionAlgorithm::AES_256_CFB,
        ContentEncryptionAlgorithm::DES_EDE3_CBC,
        ContentEncryptionAlgorithm::CAST5_CBC,
        ContentEncryptionAlgorithm::CAMELLIA_128_ECB,
    ])
}

proptest! {
    #[test]
    fn content_encryption_roundtrip(
        alg in registered(),
        seed in any::<[u8; 32]>(),
        msg in prop::collection::vec(any::<u8>(), 0..200),
    ) {
        let mut rng = ChaCha8Rng::from_seed(seed);
        let params = ContentEncryptionParams::generate(alg, &mut rng);
        let key = params.generate_key(&mut rng);

        let ciphertext = params.encrypt(&key, &msg).unwrap();
        prop_assert_eq!(ciphertext.len() % alg.block_size(), 0);
        prop_assert!(ciphertext.len() > msg.len());
        prop_assert_eq!(params.decrypt(&key, &ciphertext).unwrap(), msg);
    }

    #[test]
    fn aes_key_wrap_pad_roundtrip(
        seed in any::<[u8; 32]>(),
        key in prop::collection::vec(any::<u8>(), 3..=255),
    ) {
        let mut rng = ChaCha8Rng::from_seed(seed);
        let kek = KeyWrapAlgorithm::Aes192WrapPad.generate_key(&mut rng);

        let wrapped = KeyWrapAlgorithm::Aes192WrapPad.wrap(&mut rng, &kek, &key).unwrap();
        let unwrapped = KeyWrapAlgorithm::Aes192WrapPad.unwrap(&kek, &wrapped).unwrap();
        prop_assert_eq!(&unwrapped[..], &key[..]);
    }

    #[test]
    fn aes_key_wrap_roundtrip(seed in any::<[u8; 32]>(), semiblocks in 2usize..=31) {
        let mut rng = ChaCha8Rng::from_seed(seed);
        let kek = KeyWrapAlgorithm::Aes128Wrap.generate_key(&mut rng);
        let key = vec![0xa5; semiblocks * 8];

        let wrapped = KeyWrapAlgorithm::Aes128Wrap.wrap(&mut rng, &kek, &key).unwrap();
        prop_assert_eq!(wrapped.len(), key.len() + 8);
        let unwrapped = KeyWrapAlgorithm::Aes128Wrap.unwrap(&kek, &wrapped).unwrap();
        prop_assert_eq!(&unwrapped[..], &key[..]);
    }

    #[test]
    fn pwri_roundtrip(
        alg in pwri_cipher(),
        seed in any::<[u8; 32]>(),
        key in prop::collection::vec(any::<u8>(), 3..=255),
    ) {
        let mut rng = ChaCha8Rng::from_seed(seed);
        let wrap = KeyWrapAlgorithm::PwriKek(ContentEncryptionParams::generate(alg, &mut rng));
        let kek = wrap.generate_key(&mut rng);

        let wrapped = wrap.wrap(&mut rng, &kek, &key).unwrap();
        prop_assert_eq!(wrapped.len() % alg.block_size(), 0);
        prop_assert!(wrapped.len() >= 2 * alg.block_size());
        let unwrapped = wrap.unwrap(&kek, &wrapped).unwrap();
        prop_assert_eq!(&unwrapped[..], &key[..]);
    }

    #[test]
    fn digest_is_idempotent(msg in any::<Vec<u8>>()) {
        let content = ContentInfo::Data(msg);

        for &alg in DigestAlgorithm::ALL {
            let first = DigestedData::new(alg, &content).unwrap();
            let second = DigestedData::new(alg, &content).unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.digest.as_bytes().len(), alg.output_size());
            prop_assert_eq!(first.verify(), Some(content.clone()));
        }
    }
}
