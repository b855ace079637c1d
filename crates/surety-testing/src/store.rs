//! Store wrappers for exercising failure paths.

use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use chrono::{DateTime, Utc};
use surety_core::{
    error::{CoreError, Result},
    models::{
        AvailableGood, AvailableGoodId, AvailablePolicy, AvailablePolicyId, Customer, CustomerId,
        InspectionRef, Policy, PolicyGood, PolicyId, PolicyStatus, User, UserId,
    },
    MemoryStore, RecordStore,
};

/// Record store that fails selected operations a set number of times.
///
/// Wraps a [`MemoryStore`] and delegates everything to it, except that the
/// next `fail_completions(n)` calls to `complete_verification` return a
/// database error. Tests hold the inner store for assertions while the
/// service under test sees the flaky one.
pub struct FlakyStore {
    inner: Arc<MemoryStore>,
    failing_completions: AtomicUsize,
}

impl FlakyStore {
    /// Wraps the given store with no failures armed.
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self { inner, failing_completions: AtomicUsize::new(0) }
    }

    /// Arms the next `times` calls to `complete_verification` to fail.
    #[must_use]
    pub fn fail_completions(self, times: usize) -> Self {
        self.failing_completions.store(times, Ordering::SeqCst);
        self
    }

    fn take_completion_failure(&self) -> bool {
        self.failing_completions
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |armed| armed.checked_sub(1))
            .is_ok()
    }
}

impl RecordStore for FlakyStore {
    fn create_policy(
        &self,
        policy: Policy,
    ) -> Pin<Box<dyn Future<Output = Result<PolicyId>> + Send + '_>> {
        self.inner.create_policy(policy)
    }

    fn find_policy(
        &self,
        policy_id: PolicyId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Policy>>> + Send + '_>> {
        self.inner.find_policy(policy_id)
    }

    fn attach_inspection(
        &self,
        policy_id: PolicyId,
        inspection_id: InspectionRef,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
        self.inner.attach_inspection(policy_id, inspection_id)
    }

    fn mark_inspection_failed(
        &self,
        policy_id: PolicyId,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
        self.inner.mark_inspection_failed(policy_id)
    }

    fn append_goods(
        &self,
        policy_id: PolicyId,
        goods: Vec<PolicyGood>,
    ) -> Pin<Box<dyn Future<Output = Result<Policy>> + Send + '_>> {
        self.inner.append_goods(policy_id, goods)
    }

    fn complete_verification(
        &self,
        policy_id: PolicyId,
        status: PolicyStatus,
        start_date: Option<DateTime<Utc>>,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
        if self.take_completion_failure() {
            return Box::pin(async {
                Err(CoreError::Database("simulated connection loss".to_string()))
            });
        }
        self.inner.complete_verification(policy_id, status, start_date)
    }

    fn create_customer(
        &self,
        customer: Customer,
    ) -> Pin<Box<dyn Future<Output = Result<CustomerId>> + Send + '_>> {
        self.inner.create_customer(customer)
    }

    fn create_available_good(
        &self,
        good: AvailableGood,
    ) -> Pin<Box<dyn Future<Output = Result<AvailableGoodId>> + Send + '_>> {
        self.inner.create_available_good(good)
    }

    fn create_available_policy(
        &self,
        template: AvailablePolicy,
    ) -> Pin<Box<dyn Future<Output = Result<AvailablePolicyId>> + Send + '_>> {
        self.inner.create_available_policy(template)
    }

    fn find_available_policy(
        &self,
        id: AvailablePolicyId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<AvailablePolicy>>> + Send + '_>> {
        self.inner.find_available_policy(id)
    }

    fn find_available_goods(
        &self,
        ids: Vec<AvailableGoodId>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<AvailableGood>>> + Send + '_>> {
        self.inner.find_available_goods(ids)
    }

    fn list_available_goods(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<AvailableGood>>> + Send + '_>> {
        self.inner.list_available_goods()
    }

    fn list_available_policies(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<AvailablePolicy>>> + Send + '_>> {
        self.inner.list_available_policies()
    }

    fn catalog_is_empty(&self) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
        self.inner.catalog_is_empty()
    }

    fn create_user(&self, user: User) -> Pin<Box<dyn Future<Output = Result<UserId>> + Send + '_>> {
        self.inner.create_user(user)
    }

    fn find_user(
        &self,
        user_id: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<User>>> + Send + '_>> {
        self.inner.find_user(user_id)
    }

    fn attach_user_inspection(
        &self,
        user_id: UserId,
        inspection_id: InspectionRef,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
        self.inner.attach_user_inspection(user_id, inspection_id)
    }

    fn mark_user_verified(
        &self,
        user_id: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
        self.inner.mark_user_verified(user_id)
    }

    fn record_processed_event(
        &self,
        event_id: String,
        processed_at: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
        self.inner.record_processed_event(event_id, processed_at)
    }

    fn health_check(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        self.inner.health_check()
    }
}
