use lmsg_crypto::pedersen::{generator_h, pedersen_commit};
use lmsg_crypto::point::{serialize_point_tagged, GENERATOR_TAG};
use lmsg_crypto::rangeproof::MIN_VALUE;
use lmsg_crypto::{
    decode, encode, reembed, rewind, shared_nonce, verify, RangeProofConfig, Rewound, StegoError,
};

fn pubkey(secret: &[u8; 32]) -> Vec<u8> {
    use k256::elliptic_curve::sec1::ToEncodedPoint;
    k256::SecretKey::from_slice(secret)
        .unwrap()
        .public_key()
        .to_encoded_point(true)
        .as_bytes()
        .to_vec()
}

#[test]
fn test_sender_and_receiver_share_everything() {
    let ephemeral = [0x31u8; 32];
    let blinding_key = [0x42u8; 32];

    // Sender knows the receiver's blinding pubkey, receiver sees the ephemeral pubkey
    let sender_nonce = shared_nonce(&pubkey(&blinding_key), &ephemeral).unwrap();
    let receiver_nonce = shared_nonce(&pubkey(&ephemeral), &blinding_key).unwrap();
    assert_eq!(sender_nonce, receiver_nonce);

    let h = generator_h().unwrap();
    let blind = [0x5eu8; 32];
    let config = RangeProofConfig {
        commitment: pedersen_commit(2_100_000 + MIN_VALUE, &blind, &h).unwrap(),
        generator: serialize_point_tagged(&h, GENERATOR_TAG).unwrap(),
        nonce: sender_nonce,
        value: 2_100_000,
        value_blind: blind,
        extra_commit: vec![0x51],
        asset_id: [0x6d; 32],
        asset_blinder: [0x2a; 32],
        message: "gm".into(),
    };
    let proof = encode(&config).unwrap();

    let rewound = rewind(
        &proof,
        &receiver_nonce,
        &config.commitment,
        &config.generator,
        &config.extra_commit,
    )
    .unwrap();

    assert_eq!(
        rewound,
        Rewound {
            value: 2_100_000,
            blind,
            asset_id: [0x6d; 32],
            asset_blinder: [0x2a; 32],
            message: "gm".into(),
        }
    );
}

#[test]
fn test_rewind_with_wrong_script_fails() {
    let h = generator_h().unwrap();
    let blind = [0x01u8; 32];
    let config = RangeProofConfig {
        commitment: pedersen_commit(10 + MIN_VALUE, &blind, &h).unwrap(),
        generator: serialize_point_tagged(&h, GENERATOR_TAG).unwrap(),
        nonce: [0x09; 32],
        value: 10,
        value_blind: blind,
        extra_commit: b"right".to_vec(),
        asset_id: [0u8; 32],
        asset_blinder: [0u8; 32],
        message: String::new(),
    };
    let proof = encode(&config).unwrap();

    // The challenges come out wrong, so the recovered blind does not open the commitment
    assert_eq!(
        rewind(&proof, &config.nonce, &config.commitment, &config.generator, b"wrong"),
        Err(StegoError::CommitmentMismatch)
    );
}

#[test]
fn test_reembed_keeps_output_valid() {
    let h = generator_h().unwrap();
    let blind = [0x7au8; 32];
    let config = RangeProofConfig {
        commitment: pedersen_commit(3 + MIN_VALUE, &blind, &h).unwrap(),
        generator: serialize_point_tagged(&h, GENERATOR_TAG).unwrap(),
        nonce: [0x4c; 32],
        value: 3,
        value_blind: blind,
        extra_commit: vec![0x6a, 0x00],
        asset_id: [0x10; 32],
        asset_blinder: [0x20; 32],
        message: "first".into(),
    };
    let original = encode(&config).unwrap();

    let messages = vec!["", "second", "a much longer third message than before"];
    let mut proof = original.clone();
    for message in messages {
        proof = reembed(
            &proof,
            &config.nonce,
            &config.commitment,
            &config.generator,
            &config.extra_commit,
            message,
        )
        .unwrap();

        assert!(verify(&proof, &config.commitment, &config.generator, &config.extra_commit).is_ok());
        let out = decode(&proof, &config.nonce, &config.commitment, &config.generator).unwrap();
        assert_eq!((out.value, out.message.as_str()), (3, message));

        let rewound = rewind(&proof, &config.nonce, &config.commitment, &config.generator, &config.extra_commit).unwrap();
        assert_eq!(rewound.asset_id, [0x10; 32]);
        assert_eq!(rewound.asset_blinder, [0x20; 32]);
    }

    // Same secrets and message as the original build
    let back = reembed(&proof, &config.nonce, &config.commitment, &config.generator, &config.extra_commit, "first").unwrap();
    assert_eq!(back, original);
}
