// 11.0: every ledger state change produces an event. used for audit trails and by
// indexers/tests to observe exact computed amounts. the EventPayload enum lists all types.
// events are part of the ledger state, so a rolled-back call leaves none behind.

use crate::types::{
    AccountId, Amount, AssetId, BlockNumber, Clock, PoolTokenId, Ppm, Timestamp, TradingStatusReason,
    WithdrawalRequestId,
};
use serde::{Deserialize, Serialize};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub block: BlockNumber,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, clock: Clock, payload: EventPayload) -> Self {
        Self {
            id,
            block: clock.block,
            timestamp: clock.timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPayload {
    // Pool lifecycle / admin events
    PoolCreated(PoolCreatedEvent),
    TradingFeeUpdated(TradingFeeUpdatedEvent),
    DepositingEnabled(DepositingEnabledEvent),
    DepositLimitUpdated(DepositLimitUpdatedEvent),
    TradingEnabled(TradingEnabledEvent),
    PoolMigrated(PoolMigratedEvent),

    // Liquidity events
    TradingLiquidityUpdated(TradingLiquidityUpdatedEvent),
    TotalLiquidityUpdated(TotalLiquidityUpdatedEvent),
    TokensDeposited(TokensDepositedEvent),
    TokensWithdrawn(TokensWithdrawnEvent),

    // Trade events
    TokensTraded(TokensTradedEvent),

    // Funding events
    FundingRequested(FundingEvent),
    FundingRenounced(FundingEvent),
    FeesCollected(FeesCollectedEvent),

    // Withdrawal queue events
    WithdrawalInitiated(WithdrawalInitiatedEvent),
    WithdrawalCancelled(WithdrawalClosedEvent),
    WithdrawalCompleted(WithdrawalClosedEvent),
    LockDurationUpdated(LockDurationUpdatedEvent),

    // Network settings events
    TokenWhitelisted(TokenWhitelistedEvent),
    FundingLimitUpdated(FundingLimitUpdatedEvent),
    SettingUpdated(SettingUpdatedEvent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolCreatedEvent {
    pub pool: AssetId,
    pub pool_token: PoolTokenId,
    pub collection_version: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingFeeUpdatedEvent {
    pub pool: AssetId,
    pub prev_fee: Ppm,
    pub new_fee: Ppm,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositingEnabledEvent {
    pub pool: AssetId,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositLimitUpdatedEvent {
    pub pool: AssetId,
    pub prev_limit: Amount,
    pub new_limit: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingEnabledEvent {
    pub pool: AssetId,
    pub enabled: bool,
    pub reason: TradingStatusReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolMigratedEvent {
    pub pool: AssetId,
    pub from_version: u16,
    pub to_version: u16,
}

/// One event per leg. `asset` names the leg: the reserve asset or the pool's base asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingLiquidityUpdatedEvent {
    pub pool: AssetId,
    pub asset: AssetId,
    pub prev_liquidity: Amount,
    pub new_liquidity: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalLiquidityUpdatedEvent {
    pub pool: AssetId,
    pub staked_balance: Amount,
    pub pool_token_supply: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokensDepositedEvent {
    pub pool: AssetId,
    pub provider: AccountId,
    pub amount: Amount,
    pub pool_token_amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokensWithdrawnEvent {
    pub pool: AssetId,
    pub provider: AccountId,
    // paid out, fee already deducted
    pub amount: Amount,
    pub pool_token_amount: Amount,
    pub withdrawal_fee: Amount,
    pub protection_amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokensTradedEvent {
    pub pool: AssetId,
    pub trader: AccountId,
    pub source_asset: AssetId,
    pub target_asset: AssetId,
    pub source_amount: Amount,
    pub target_amount: Amount,
    pub trading_fee: Amount,
    pub network_fee: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingEvent {
    pub pool: AssetId,
    pub amount: Amount,
    pub pool_token_amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeesCollectedEvent {
    pub pool: AssetId,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalInitiatedEvent {
    pub request_id: WithdrawalRequestId,
    pub provider: AccountId,
    pub pool: AssetId,
    pub pool_token_amount: Amount,
    pub reserve_token_amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalClosedEvent {
    pub request_id: WithdrawalRequestId,
    pub provider: AccountId,
    pub pool: AssetId,
    pub pool_token_amount: Amount,
    pub time_elapsed_secs: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockDurationUpdatedEvent {
    pub prev_duration_secs: i64,
    pub new_duration_secs: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenWhitelistedEvent {
    pub asset: AssetId,
    pub whitelisted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingLimitUpdatedEvent {
    pub pool: AssetId,
    pub prev_limit: Amount,
    pub new_limit: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Setting {
    MinLiquidityForTrading,
    WithdrawalFeePpm,
    DefaultTradingFeePpm,
    NetworkFeePpm,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingUpdatedEvent {
    pub setting: Setting,
    pub prev_value: Amount,
    pub new_value: Amount,
}

pub trait EventEmitter {
    fn emit(&mut self, event: Event);
}

/// Bounded, append-only event log. The oldest events are dropped past `max_events`.
/// Between `begin` and `commit` nothing is dropped, so `rollback` can undo the call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<Event>,
    next_id: u64,
    max_events: usize,
    #[serde(skip)]
    open: bool,
}

impl EventLog {
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Vec::new(),
            next_id: 1,
            max_events: max_events.max(1),
            open: false,
        }
    }

    /// Opens a call. Returns the mark to roll back to.
    pub fn begin(&mut self) -> EventId {
        self.open = true;
        self.peek_id()
    }

    pub fn commit(&mut self) {
        self.open = false;
        self.trim();
    }

    /// Drops every event recorded since `mark` and reuses their ids.
    pub fn rollback(&mut self, mark: EventId) {
        let keep = self.events.partition_point(|e| e.id < mark);
        self.events.truncate(keep);
        self.next_id = mark.0;
        self.open = false;
    }

    fn trim(&mut self) {
        if self.events.len() > self.max_events {
            let drain_count = self.events.len() - self.max_events;
            self.events.drain(0..drain_count);
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn last(&self) -> Option<&Event> {
        self.events.last()
    }

    /// Id the next recorded event will get. Pass it to `since` to observe one call.
    pub fn peek_id(&self) -> EventId {
        EventId(self.next_id)
    }

    pub fn since(&self, id: EventId) -> impl Iterator<Item = &EventPayload> {
        self.events.iter().filter(move |e| e.id >= id).map(|e| &e.payload)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn next_id(&mut self) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn record(&mut self, clock: Clock, payload: EventPayload) -> EventId {
        let id = self.next_id();
        self.emit(Event::new(id, clock, payload));
        id
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(100_000)
    }
}

impl EventEmitter for EventLog {
    fn emit(&mut self, event: Event) {
        trace!(id = event.id.0, block = event.block.0, payload = ?event.payload, "event");
        self.events.push(event);
        if !self.open {
            self.trim();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deposit(amount: Amount) -> EventPayload {
        EventPayload::TokensDeposited(TokensDepositedEvent {
            pool: AssetId(1),
            provider: AccountId(1),
            amount,
            pool_token_amount: amount,
        })
    }

    #[test]
    fn event_log_records_in_order() {
        let mut log = EventLog::new(10);
        let clock = Clock::genesis(Timestamp::from_secs(1_000));

        let first = log.record(clock, deposit(5));
        let second = log.record(clock, deposit(7));

        assert!(first < second);
        assert_eq!(log.len(), 2);
        assert_eq!(log.last().unwrap().block, BlockNumber(1));
        assert_eq!(log.since(second).count(), 1);

        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn event_log_trims_oldest() {
        let mut log = EventLog::new(3);
        let clock = Clock::genesis(Timestamp::from_secs(0));
        for i in 0..5 {
            log.record(clock, deposit(i));
        }

        assert_eq!(log.len(), 3);
        assert_eq!(log.events()[0].id, EventId(3));
        assert_eq!(log.peek_id(), EventId(6));
    }

    #[test]
    fn rollback_restores_log_past_the_bound() {
        let mut log = EventLog::new(3);
        let clock = Clock::genesis(Timestamp::from_secs(0));
        for i in 0..3 {
            log.record(clock, deposit(i));
        }

        let mark = log.begin();
        log.record(clock, deposit(10));
        log.record(clock, deposit(11));
        assert_eq!(log.len(), 5);
        log.rollback(mark);

        assert_eq!(log.len(), 3);
        assert_eq!(log.events()[0].id, EventId(1));
        assert_eq!(log.peek_id(), mark);

        log.begin();
        log.record(clock, deposit(12));
        log.commit();
        assert_eq!(log.len(), 3);
        assert_eq!(log.events()[2].id, EventId(4));
    }

    #[test]
    fn trading_disabled_event() {
        let event = TradingEnabledEvent {
            pool: AssetId(4),
            enabled: false,
            reason: TradingStatusReason::MinLiquidity,
        };
        assert!(!event.enabled);
        assert_eq!(event.reason, TradingStatusReason::MinLiquidity);
    }
}
