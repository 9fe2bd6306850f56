use proptest::prelude::*;
use tether_core::crypto::{NONCE_LEN, TAG_LEN};
use tether_core::{Address, Cryptor};

proptest! {
    /// Any plaintext should survive encrypt→decrypt under the same secret.
    #[test]
    fn roundtrip_any_payload(
        secret in ".{0,64}",
        payload in prop::collection::vec(any::<u8>(), 0..50000),
    ) {
        let sender = Cryptor::new(&secret);
        let receiver = Cryptor::new(&secret);
        let sealed = sender.encrypt(&payload).expect("encrypt");
        let opened = receiver.decrypt(&sealed).expect("decrypt");
        prop_assert_eq!(&opened, &payload);
    }

    /// Sealed size is always nonce + plaintext + tag.
    #[test]
    fn sealed_size_invariant(
        payload in prop::collection::vec(any::<u8>(), 0..10000),
    ) {
        let sealed = Cryptor::new("k").encrypt(&payload).expect("encrypt");
        prop_assert_eq!(sealed.len(), NONCE_LEN + payload.len() + TAG_LEN);
    }

    /// A different secret never opens the payload.
    #[test]
    fn other_secret_rejected(
        a in "[a-z]{1,16}",
        b in "[A-Z]{1,16}",
        payload in prop::collection::vec(any::<u8>(), 0..1000),
    ) {
        let sealed = Cryptor::new(&a).encrypt(&payload).expect("encrypt");
        prop_assert!(Cryptor::new(&b).decrypt(&sealed).is_err());
    }

    /// Flipping any byte of the sealed payload breaks authentication.
    #[test]
    fn any_bit_flip_rejected(
        payload in prop::collection::vec(any::<u8>(), 1..512),
        index in any::<prop::sample::Index>(),
        mask in 1u8..=255,
    ) {
        let cryptor = Cryptor::new("k");
        let mut sealed = cryptor.encrypt(&payload).expect("encrypt");
        let i = index.index(sealed.len());
        sealed[i] ^= mask;
        prop_assert!(cryptor.decrypt(&sealed).is_err());
    }

    /// Arbitrary bytes never panic the decoder.
    #[test]
    fn decrypt_garbage_never_panics(
        data in prop::collection::vec(any::<u8>(), 0..256),
    ) {
        let _ = Cryptor::new("k").decrypt(&data);
    }

    /// A rendered address parses back to itself.
    #[test]
    fn address_render_parse_roundtrip(
        host in "[a-z0-9.:-]{0,40}",
        port in any::<u16>(),
    ) {
        let addr = Address::new(host.clone(), port);
        let rendered = addr.to_string();
        prop_assert_eq!(&rendered, &format!("{host}:{port}"));
        let parsed: Address = rendered.parse().expect("parse");
        prop_assert_eq!(parsed, addr);
    }
}
