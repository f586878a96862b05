// 10.0 pending_withdrawals.rs: the withdrawal cooldown queue.
// 10.1 initiate: provider's pool-shares move into queue custody, a request is recorded.
// 10.2 cancel: shares go back to the provider, request deleted. allowed any time.
// 10.3 complete: once the lock has elapsed the shares move to AccountId::NETWORK, where the
//      pool collection (or the funding pool, for the reserve asset) redeems them.
//
// Pending --(lock elapses)--> Ready --complete--> gone
// Pending | Ready --cancel--> gone

use crate::capability::{authorize, AdminCapability, NetworkCapability, NetworkId};
use crate::context::Context;
use crate::errors::LedgerError;
use crate::events::{
    EventPayload, LockDurationUpdatedEvent, WithdrawalClosedEvent, WithdrawalInitiatedEvent,
};
use crate::types::{AccountId, Amount, AssetId, PoolTokenId, Timestamp, WithdrawalRequestId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub id: WithdrawalRequestId,
    pub provider: AccountId,
    pub pool_token: PoolTokenId,
    pub reserve_token: AssetId,
    pub pool_token_amount: Amount,
    // value of the shares when the request was made
    pub reserve_token_amount: Amount,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WithdrawalStatus {
    Pending,
    Ready,
}

/// What `complete` hands over for redemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletedWithdrawal {
    pub pool_token: PoolTokenId,
    pub reserve_token: AssetId,
    pub pool_token_amount: Amount,
}

#[derive(Debug, Clone)]
pub struct PendingWithdrawals {
    network: NetworkId,
    lock_duration_secs: i64,
    next_id: u64,
    requests: BTreeMap<WithdrawalRequestId, WithdrawalRequest>,
    by_provider: BTreeMap<AccountId, BTreeSet<WithdrawalRequestId>>,
}

impl PendingWithdrawals {
    pub fn new(network: NetworkId, lock_duration_secs: i64) -> Self {
        Self {
            network,
            lock_duration_secs,
            next_id: 1,
            requests: BTreeMap::new(),
            by_provider: BTreeMap::new(),
        }
    }

    pub fn lock_duration_secs(&self) -> i64 {
        self.lock_duration_secs
    }

    pub fn set_lock_duration(
        &mut self,
        admin: &AdminCapability,
        ctx: &mut Context<'_>,
        secs: i64,
    ) -> Result<(), LedgerError> {
        authorize(admin, self.network)?;
        if secs < 0 {
            return Err(LedgerError::InvalidParam("lock duration cannot be negative".to_string()));
        }
        let prev = self.lock_duration_secs;
        if prev == secs {
            return Ok(());
        }
        self.lock_duration_secs = secs;
        ctx.emit(EventPayload::LockDurationUpdated(LockDurationUpdatedEvent {
            prev_duration_secs: prev,
            new_duration_secs: secs,
        }));
        Ok(())
    }

    pub fn request(&self, id: WithdrawalRequestId) -> Option<&WithdrawalRequest> {
        self.requests.get(&id)
    }

    pub fn withdrawal_requests(&self, provider: AccountId) -> Vec<WithdrawalRequestId> {
        self.by_provider
            .get(&provider)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn withdrawal_request_count(&self, provider: AccountId) -> usize {
        self.by_provider.get(&provider).map(|ids| ids.len()).unwrap_or(0)
    }

    pub fn status(&self, id: WithdrawalRequestId, now: Timestamp) -> Option<WithdrawalStatus> {
        self.requests.get(&id).map(|request| {
            if self.is_ready(request, now) {
                WithdrawalStatus::Ready
            } else {
                WithdrawalStatus::Pending
            }
        })
    }

    pub fn is_ready_for_withdrawal(&self, id: WithdrawalRequestId, now: Timestamp) -> bool {
        self.status(id, now) == Some(WithdrawalStatus::Ready)
    }

    /** 10.1: `reserve_token_amount` is the caller's valuation of the shares */
    pub fn initiate(
        &mut self,
        cap: &NetworkCapability,
        ctx: &mut Context<'_>,
        provider: AccountId,
        pool_token: PoolTokenId,
        pool_token_amount: Amount,
        reserve_token_amount: Amount,
    ) -> Result<WithdrawalRequestId, LedgerError> {
        authorize(cap, self.network)?;
        if pool_token_amount == 0 {
            return Err(LedgerError::ZeroValue);
        }
        if provider.is_protocol() {
            return Err(LedgerError::InvalidAddress);
        }
        let reserve_token = ctx
            .tokens
            .get(pool_token)
            .map(|t| t.underlying)
            .ok_or(LedgerError::InvalidPool)?;

        ctx.tokens
            .token_mut(pool_token)?
            .transfer(provider, AccountId::PENDING_WITHDRAWALS, pool_token_amount)?;

        let id = WithdrawalRequestId(self.next_id);
        self.next_id += 1;
        self.requests.insert(
            id,
            WithdrawalRequest {
                id,
                provider,
                pool_token,
                reserve_token,
                pool_token_amount,
                reserve_token_amount,
                created_at: ctx.clock.timestamp,
            },
        );
        self.by_provider.entry(provider).or_default().insert(id);

        debug!(request = id.0, %provider, pool_token_amount, "withdrawal initiated");
        ctx.emit(EventPayload::WithdrawalInitiated(WithdrawalInitiatedEvent {
            request_id: id,
            provider,
            pool: reserve_token,
            pool_token_amount,
            reserve_token_amount,
        }));
        Ok(id)
    }

    /** 10.2: returns the locked shares to their owner */
    pub fn cancel(
        &mut self,
        cap: &NetworkCapability,
        ctx: &mut Context<'_>,
        provider: AccountId,
        id: WithdrawalRequestId,
    ) -> Result<Amount, LedgerError> {
        authorize(cap, self.network)?;
        let request = self.owned_request(provider, id)?;

        ctx.tokens.token_mut(request.pool_token)?.transfer(
            AccountId::PENDING_WITHDRAWALS,
            provider,
            request.pool_token_amount,
        )?;
        self.remove(&request);

        ctx.emit(EventPayload::WithdrawalCancelled(WithdrawalClosedEvent {
            request_id: id,
            provider,
            pool: request.reserve_token,
            pool_token_amount: request.pool_token_amount,
            time_elapsed_secs: request.created_at.elapsed_secs(&ctx.clock.timestamp),
        }));
        Ok(request.pool_token_amount)
    }

    /** 10.3: releases the shares of a ready request for redemption */
    pub fn complete(
        &mut self,
        cap: &NetworkCapability,
        ctx: &mut Context<'_>,
        provider: AccountId,
        id: WithdrawalRequestId,
    ) -> Result<CompletedWithdrawal, LedgerError> {
        authorize(cap, self.network)?;
        let request = self.owned_request(provider, id)?;
        if !self.is_ready(&request, ctx.clock.timestamp) {
            return Err(LedgerError::WithdrawalNotReady);
        }

        ctx.tokens.token_mut(request.pool_token)?.transfer(
            AccountId::PENDING_WITHDRAWALS,
            AccountId::NETWORK,
            request.pool_token_amount,
        )?;
        self.remove(&request);

        ctx.emit(EventPayload::WithdrawalCompleted(WithdrawalClosedEvent {
            request_id: id,
            provider,
            pool: request.reserve_token,
            pool_token_amount: request.pool_token_amount,
            time_elapsed_secs: request.created_at.elapsed_secs(&ctx.clock.timestamp),
        }));
        Ok(CompletedWithdrawal {
            pool_token: request.pool_token,
            reserve_token: request.reserve_token,
            pool_token_amount: request.pool_token_amount,
        })
    }

    fn is_ready(&self, request: &WithdrawalRequest, now: Timestamp) -> bool {
        request.created_at.elapsed_secs(&now) >= self.lock_duration_secs
    }

    fn owned_request(&self, provider: AccountId, id: WithdrawalRequestId) -> Result<WithdrawalRequest, LedgerError> {
        let request = self.requests.get(&id).ok_or(LedgerError::DoesNotExist)?;
        if request.provider != provider {
            return Err(LedgerError::AccessDenied);
        }
        Ok(request.clone())
    }

    fn remove(&mut self, request: &WithdrawalRequest) {
        self.requests.remove(&request.id);
        if let Some(ids) = self.by_provider.get_mut(&request.provider) {
            ids.remove(&request.id);
            if ids.is_empty() {
                self.by_provider.remove(&request.provider);
            }
        }
    }
}
