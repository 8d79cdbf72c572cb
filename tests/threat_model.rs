use kdfwrap::device::{SecureElement, SLOT_LEN};
use kdfwrap::error::DeviceStatus;
use kdfwrap::keys::{EncryptedDerivationResult, SharedProtectionSecret};
use kdfwrap::recover::recover;
use kdfwrap::simulator::SimulatedElement;
use kdfwrap::{Config, Host, KdfWrapError, RunMode};

fn provisioned() -> (Host, SimulatedElement) {
    let mut host = Host::new(Config::demo());
    let mut se = SimulatedElement::initialize(&host.config().device).unwrap();
    host.run(&mut se, RunMode::ProvisionIoProtectionKey).unwrap();
    host.run(&mut se, RunMode::ProvisionParentKey).unwrap();
    (host, se)
}

#[test]
fn test_wrong_shared_secret_yields_wrong_key_silently() {
    // No integrity check: an eavesdropper without the secret gets a value,
    // just not the key.
    let (mut host, mut se) = provisioned();
    let recovery = host.recover(&mut se).unwrap();

    let attacker = SharedProtectionSecret::from_bytes([0u8; 32]);
    let guess = recover(
        &attacker,
        &recovery.output.nonce,
        &recovery.output.encrypted_result,
    );
    assert_ne!(guess, recovery.key);
}

#[test]
fn test_tampered_result_is_not_detected() {
    let (mut host, mut se) = provisioned();
    let recovery = host.recover(&mut se).unwrap();

    let mut bytes = *recovery.output.encrypted_result.as_bytes();
    bytes[0] ^= 0x01;
    let tampered = recover(
        &host.config().shared_secret,
        &recovery.output.nonce,
        &EncryptedDerivationResult::from_bytes(bytes),
    );

    // Exactly the flipped bit differs.
    assert_eq!(tampered.as_bytes()[0] ^ recovery.key.as_bytes()[0], 0x01);
    assert_eq!(tampered.as_bytes()[1..], recovery.key.as_bytes()[1..]);
}

#[test]
fn test_nonce_from_other_exchange_yields_wrong_key() {
    let (mut host, mut se) = provisioned();
    let a = host.recover(&mut se).unwrap();
    let b = host.recover(&mut se).unwrap();

    let mixed = recover(
        &host.config().shared_secret,
        &a.output.nonce,
        &b.output.encrypted_result,
    );
    assert_ne!(mixed, a.key);
}

#[test]
fn test_parent_key_provisioned_under_wrong_secret_changes_key() {
    let (mut host, mut se) = provisioned();
    let good = host.recover(&mut se).unwrap();

    // A host with a different secret masks the parent key differently, so the
    // element stores a different parent.
    let mut rogue_cfg = Config::demo();
    rogue_cfg.shared_secret = SharedProtectionSecret::from_bytes([0x55; 32]);
    let rogue = Host::new(rogue_cfg);
    rogue.provision_parent_key(&mut se).unwrap();

    let after = host.recover(&mut se).unwrap();
    assert_ne!(good.key, after.key);
}

#[test]
fn test_locked_parent_slot_cannot_be_replaced() {
    let (host, mut se) = provisioned();
    let slot = host.config().device.parent_key_slot;
    se.lock_slot(slot).unwrap();

    assert!(matches!(
        host.provision_parent_key(&mut se),
        Err(KdfWrapError::Device(DeviceStatus::SlotLocked))
    ));
    assert!(matches!(
        se.write_slot(slot, &[0u8; SLOT_LEN]),
        Err(KdfWrapError::Device(DeviceStatus::SlotLocked))
    ));
}

#[test]
fn test_recover_before_provisioning_fails_with_device_error() {
    let mut host = Host::new(Config::demo());
    let mut se = SimulatedElement::initialize(&host.config().device).unwrap();

    let err = host.recover(&mut se).unwrap_err();
    assert!(matches!(err, KdfWrapError::Device(_)));
    assert!(host.recovery_log().is_empty());
}
