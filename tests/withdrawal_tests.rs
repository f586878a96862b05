//! Withdrawal cooldown queue, driven through the network.
//!
//! Pending --(lock elapses)--> Ready --withdraw--> gone, with cancel allowed from either state.

use liquidity_ledger::*;

const LINK: AssetId = AssetId(1);
const ALICE: AccountId = AccountId(10);
const BOB: AccountId = AccountId(11);

/// Alice and Bob each hold 1000 LINK pool shares. Default config: one week lock.
fn setup() -> (Network, AdminCapability, PoolTokenId) {
    let (mut network, admin) = Network::new(LedgerConfig::default(), Timestamp::from_secs(1_700_000_000)).unwrap();
    network.add_token_to_whitelist(&admin, LINK).unwrap();
    let pool_token = network.create_pool(&admin, LINK).unwrap();
    network.set_deposit_limit(&admin, LINK, Amount::MAX).unwrap();
    for provider in [ALICE, BOB] {
        network.fund_wallet(&admin, provider, LINK, 1_000).unwrap();
        network.deposit(provider, LINK, 1_000).unwrap();
    }
    (network, admin, pool_token)
}

#[test]
fn request_ripens_after_lock_duration() {
    let (mut network, _admin, pool_token) = setup();
    let lock = network.pending_withdrawals().lock_duration_secs();
    assert_eq!(lock, 7 * 24 * 60 * 60);

    let id = network.initiate_withdrawal(ALICE, pool_token, 400).unwrap();
    assert_eq!(network.withdrawal_status(id), Some(WithdrawalStatus::Pending));
    assert_eq!(network.withdraw(ALICE, id), Err(LedgerError::WithdrawalNotReady));

    network.advance(1, lock - 1);
    assert_eq!(network.withdrawal_status(id), Some(WithdrawalStatus::Pending));
    assert_eq!(network.withdraw(ALICE, id), Err(LedgerError::WithdrawalNotReady));

    network.advance(1, 1);
    assert_eq!(network.withdrawal_status(id), Some(WithdrawalStatus::Ready));
    network.withdraw(ALICE, id).unwrap();
    assert_eq!(network.withdrawal_status(id), None);
    assert_eq!(network.pool_token_balance(LINK, ALICE).unwrap(), 600);
}

#[test]
fn initiate_locks_shares_and_values_them() {
    let (mut network, _admin, pool_token) = setup();
    let id = network.initiate_withdrawal(ALICE, pool_token, 400).unwrap();

    let request = network.withdrawal_request(id).unwrap().clone();
    assert_eq!(request.provider, ALICE);
    assert_eq!(request.pool_token, pool_token);
    assert_eq!(request.reserve_token, LINK);
    assert_eq!(request.pool_token_amount, 400);
    assert_eq!(request.reserve_token_amount, 400);
    assert_eq!(network.pool_token_balance(LINK, ALICE).unwrap(), 600);
    assert_eq!(network.pool_token_balance(LINK, AccountId::PENDING_WITHDRAWALS).unwrap(), 400);

    assert_eq!(
        network.initiate_withdrawal(ALICE, pool_token, 601),
        Err(LedgerError::InsufficientBalance)
    );
}

#[test]
fn cancel_returns_shares_and_closes_request() {
    let (mut network, _admin, pool_token) = setup();
    let id = network.initiate_withdrawal(ALICE, pool_token, 400).unwrap();

    assert_eq!(network.cancel_withdrawal(ALICE, id).unwrap(), 400);
    assert_eq!(network.pool_token_balance(LINK, ALICE).unwrap(), 1_000);
    assert!(network.withdrawal_request(id).is_none());

    assert_eq!(network.cancel_withdrawal(ALICE, id), Err(LedgerError::DoesNotExist));
    assert_eq!(network.withdraw(ALICE, id), Err(LedgerError::DoesNotExist));
}

#[test]
fn completed_request_cannot_be_cancelled() {
    let (mut network, _admin, pool_token) = setup();
    let id = network.initiate_withdrawal(ALICE, pool_token, 400).unwrap();
    network.advance(1, network.pending_withdrawals().lock_duration_secs());
    network.withdraw(ALICE, id).unwrap();

    assert_eq!(network.cancel_withdrawal(ALICE, id), Err(LedgerError::DoesNotExist));
    assert_eq!(network.withdraw(ALICE, id), Err(LedgerError::DoesNotExist));
}

#[test]
fn only_the_owner_can_act_on_a_request() {
    let (mut network, _admin, pool_token) = setup();
    let id = network.initiate_withdrawal(ALICE, pool_token, 400).unwrap();
    network.advance(1, network.pending_withdrawals().lock_duration_secs());

    assert_eq!(network.cancel_withdrawal(BOB, id), Err(LedgerError::AccessDenied));
    assert_eq!(network.withdraw(BOB, id), Err(LedgerError::AccessDenied));
    assert_eq!(network.withdrawal_status(id), Some(WithdrawalStatus::Ready));
}

#[test]
fn requests_are_listed_per_provider() {
    let (mut network, _admin, pool_token) = setup();
    let first = network.initiate_withdrawal(ALICE, pool_token, 100).unwrap();
    let bob = network.initiate_withdrawal(BOB, pool_token, 100).unwrap();
    let second = network.initiate_withdrawal(ALICE, pool_token, 200).unwrap();

    assert_eq!(network.withdrawal_requests(ALICE), vec![first, second]);
    assert_eq!(network.withdrawal_requests(BOB), vec![bob]);

    network.cancel_withdrawal(ALICE, first).unwrap();
    assert_eq!(network.withdrawal_requests(ALICE), vec![second]);
    assert_eq!(network.pending_withdrawals().withdrawal_request_count(ALICE), 1);

    network.cancel_withdrawal(ALICE, second).unwrap();
    assert!(network.withdrawal_requests(ALICE).is_empty());
}

#[test]
fn lock_duration_change_applies_to_open_requests() {
    let (mut network, admin, pool_token) = setup();
    let id = network.initiate_withdrawal(ALICE, pool_token, 400).unwrap();
    assert_eq!(network.withdrawal_status(id), Some(WithdrawalStatus::Pending));

    let marker = network.events().peek_id();
    network.set_lock_duration(&admin, 0).unwrap();
    assert_eq!(network.withdrawal_status(id), Some(WithdrawalStatus::Ready));

    let updated = network.events().since(marker).any(|payload| {
        matches!(
            payload,
            EventPayload::LockDurationUpdated(LockDurationUpdatedEvent { new_duration_secs: 0, .. })
        )
    });
    assert!(updated);

    assert!(matches!(
        network.set_lock_duration(&admin, -1),
        Err(LedgerError::InvalidParam(_))
    ));
    network.withdraw(ALICE, id).unwrap();
}

#[test]
fn foreign_admin_cannot_change_lock() {
    let (mut network, _admin, _pool_token) = setup();
    let (_other, other_admin) = Network::new(LedgerConfig::default(), Timestamp::from_secs(0)).unwrap();
    assert_eq!(network.set_lock_duration(&other_admin, 0), Err(LedgerError::AccessDenied));
}
