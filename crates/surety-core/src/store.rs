//! Record-store abstraction for the workflow handlers.
//!
//! Provides a trait-based seam over persistence so handlers receive their
//! store by injection instead of reaching for a process-wide handle. Two
//! implementations exist: `PgStore` wraps the concrete
//! [`crate::storage::Storage`] repositories, and [`memory::MemoryStore`]
//! keeps everything in process. The in-memory store is not just a test
//! double: when no database is configured the service boots on it, the same
//! way the demo deployment runs against an in-process database.

use std::{future::Future, pin::Pin, sync::Arc};

use chrono::{DateTime, Utc};

use crate::{
    error::Result,
    models::{
        AvailableGood, AvailableGoodId, AvailablePolicy, AvailablePolicyId, Customer, CustomerId,
        InspectionRef, Policy, PolicyGood, PolicyId, PolicyStatus, User, UserId,
    },
};

/// Persistence operations required by the workflow handlers.
///
/// This trait abstracts every read and write the two workflows perform,
/// enabling both the PostgreSQL implementation and the in-memory one. All
/// status transitions are guarded on the current state inside the
/// implementations, so callers can treat replays and races as no-ops.
pub trait RecordStore: Send + Sync + 'static {
    /// Inserts a new policy in its initial saga state.
    fn create_policy(
        &self,
        policy: Policy,
    ) -> Pin<Box<dyn Future<Output = Result<PolicyId>> + Send + '_>>;

    /// Finds a policy by ID.
    fn find_policy(
        &self,
        policy_id: PolicyId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Policy>>> + Send + '_>>;

    /// Attaches the provider inspection and promotes the policy from
    /// `pending_inspection` to `waiting_verification`.
    ///
    /// Returns whether the promotion applied; false means the policy was
    /// not pending (or does not exist).
    fn attach_inspection(
        &self,
        policy_id: PolicyId,
        inspection_id: InspectionRef,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>>;

    /// Records that the provider call during initiation failed, moving the
    /// policy from `pending_inspection` to `inspection_failed`.
    fn mark_inspection_failed(
        &self,
        policy_id: PolicyId,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>>;

    /// Appends goods to the policy's embedded list.
    ///
    /// Returns the updated policy; a missing policy is a `NotFound` error.
    fn append_goods(
        &self,
        policy_id: PolicyId,
        goods: Vec<PolicyGood>,
    ) -> Pin<Box<dyn Future<Output = Result<Policy>> + Send + '_>>;

    /// Applies the webhook verdict transition, guarded on
    /// `waiting_verification`.
    ///
    /// Returns whether the transition applied; false means the policy was
    /// already closed out or never reached verification.
    fn complete_verification(
        &self,
        policy_id: PolicyId,
        status: PolicyStatus,
        start_date: Option<DateTime<Utc>>,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>>;

    /// Inserts a new customer.
    fn create_customer(
        &self,
        customer: Customer,
    ) -> Pin<Box<dyn Future<Output = Result<CustomerId>> + Send + '_>>;

    /// Inserts a catalog good. Used by startup seeding and fixtures.
    fn create_available_good(
        &self,
        good: AvailableGood,
    ) -> Pin<Box<dyn Future<Output = Result<AvailableGoodId>> + Send + '_>>;

    /// Inserts a policy template. Used by startup seeding and fixtures.
    fn create_available_policy(
        &self,
        template: AvailablePolicy,
    ) -> Pin<Box<dyn Future<Output = Result<AvailablePolicyId>> + Send + '_>>;

    /// Finds a policy template by ID.
    fn find_available_policy(
        &self,
        id: AvailablePolicyId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<AvailablePolicy>>> + Send + '_>>;

    /// Bulk-reads catalog goods by ID.
    ///
    /// Result order is unspecified and may not match the input; callers
    /// match rows back by ID.
    fn find_available_goods(
        &self,
        ids: Vec<AvailableGoodId>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<AvailableGood>>> + Send + '_>>;

    /// Lists the goods catalog.
    fn list_available_goods(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<AvailableGood>>> + Send + '_>>;

    /// Lists the policy-template catalog.
    fn list_available_policies(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<AvailablePolicy>>> + Send + '_>>;

    /// Whether both catalog collections are empty. Drives startup seeding.
    fn catalog_is_empty(&self) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>>;

    /// Inserts a new user with `verified = false`.
    fn create_user(&self, user: User) -> Pin<Box<dyn Future<Output = Result<UserId>> + Send + '_>>;

    /// Finds a user by ID.
    fn find_user(
        &self,
        user_id: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<User>>> + Send + '_>>;

    /// Stores the people inspection created for a user at registration.
    fn attach_user_inspection(
        &self,
        user_id: UserId,
        inspection_id: InspectionRef,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>>;

    /// Marks a user verified, guarded on `verified = false`.
    ///
    /// Returns whether this call performed the flip.
    fn mark_user_verified(
        &self,
        user_id: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>>;

    /// Records a webhook envelope event ID in the idempotency ledger.
    ///
    /// Returns true when the ID was newly recorded; false means the event
    /// was already processed and its transition must not be reapplied.
    fn record_processed_event(
        &self,
        event_id: String,
        processed_at: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>>;

    /// Verifies the backing store is reachable.
    fn health_check(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production store implementation using PostgreSQL.
///
/// Wraps the concrete [`crate::storage::Storage`] to implement `RecordStore`.
/// All database operations go through the repository pattern for consistency
/// and type safety.
pub struct PgStore {
    storage: Arc<crate::storage::Storage>,
}

impl PgStore {
    /// Creates a new PostgreSQL store adapter.
    pub fn new(storage: Arc<crate::storage::Storage>) -> Self {
        Self { storage }
    }
}

impl RecordStore for PgStore {
    fn create_policy(
        &self,
        policy: Policy,
    ) -> Pin<Box<dyn Future<Output = Result<PolicyId>> + Send + '_>> {
        let storage = self.storage.clone();
        Box::pin(async move { storage.policies.create(&policy).await })
    }

    fn find_policy(
        &self,
        policy_id: PolicyId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Policy>>> + Send + '_>> {
        let storage = self.storage.clone();
        Box::pin(async move { storage.policies.find_by_id(policy_id).await })
    }

    fn attach_inspection(
        &self,
        policy_id: PolicyId,
        inspection_id: InspectionRef,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
        let storage = self.storage.clone();
        Box::pin(async move { storage.policies.attach_inspection(policy_id, &inspection_id).await })
    }

    fn mark_inspection_failed(
        &self,
        policy_id: PolicyId,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
        let storage = self.storage.clone();
        Box::pin(async move { storage.policies.mark_inspection_failed(policy_id).await })
    }

    fn append_goods(
        &self,
        policy_id: PolicyId,
        goods: Vec<PolicyGood>,
    ) -> Pin<Box<dyn Future<Output = Result<Policy>> + Send + '_>> {
        let storage = self.storage.clone();
        Box::pin(async move { storage.policies.append_goods(policy_id, goods).await })
    }

    fn complete_verification(
        &self,
        policy_id: PolicyId,
        status: PolicyStatus,
        start_date: Option<DateTime<Utc>>,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
        let storage = self.storage.clone();
        Box::pin(async move {
            storage.policies.complete_verification(policy_id, status, start_date).await
        })
    }

    fn create_customer(
        &self,
        customer: Customer,
    ) -> Pin<Box<dyn Future<Output = Result<CustomerId>> + Send + '_>> {
        let storage = self.storage.clone();
        Box::pin(async move { storage.customers.create(&customer).await })
    }

    fn create_available_good(
        &self,
        good: AvailableGood,
    ) -> Pin<Box<dyn Future<Output = Result<AvailableGoodId>> + Send + '_>> {
        let storage = self.storage.clone();
        Box::pin(async move { storage.available_goods.create(&good).await })
    }

    fn create_available_policy(
        &self,
        template: AvailablePolicy,
    ) -> Pin<Box<dyn Future<Output = Result<AvailablePolicyId>> + Send + '_>> {
        let storage = self.storage.clone();
        Box::pin(async move { storage.available_policies.create(&template).await })
    }

    fn find_available_policy(
        &self,
        id: AvailablePolicyId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<AvailablePolicy>>> + Send + '_>> {
        let storage = self.storage.clone();
        Box::pin(async move { storage.available_policies.find_by_id(id).await })
    }

    fn find_available_goods(
        &self,
        ids: Vec<AvailableGoodId>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<AvailableGood>>> + Send + '_>> {
        let storage = self.storage.clone();
        Box::pin(async move { storage.available_goods.find_by_ids(&ids).await })
    }

    fn list_available_goods(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<AvailableGood>>> + Send + '_>> {
        let storage = self.storage.clone();
        Box::pin(async move { storage.available_goods.list().await })
    }

    fn list_available_policies(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<AvailablePolicy>>> + Send + '_>> {
        let storage = self.storage.clone();
        Box::pin(async move { storage.available_policies.list().await })
    }

    fn catalog_is_empty(&self) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
        let storage = self.storage.clone();
        Box::pin(async move {
            let goods = storage.available_goods.count().await?;
            let templates = storage.available_policies.count().await?;
            Ok(goods == 0 && templates == 0)
        })
    }

    fn create_user(&self, user: User) -> Pin<Box<dyn Future<Output = Result<UserId>> + Send + '_>> {
        let storage = self.storage.clone();
        Box::pin(async move { storage.users.create(&user).await })
    }

    fn find_user(
        &self,
        user_id: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<User>>> + Send + '_>> {
        let storage = self.storage.clone();
        Box::pin(async move { storage.users.find_by_id(user_id).await })
    }

    fn attach_user_inspection(
        &self,
        user_id: UserId,
        inspection_id: InspectionRef,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
        let storage = self.storage.clone();
        Box::pin(async move { storage.users.attach_inspection(user_id, &inspection_id).await })
    }

    fn mark_user_verified(
        &self,
        user_id: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
        let storage = self.storage.clone();
        Box::pin(async move { storage.users.mark_verified(user_id).await })
    }

    fn record_processed_event(
        &self,
        event_id: String,
        processed_at: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
        let storage = self.storage.clone();
        Box::pin(async move { storage.processed_events.record(&event_id, processed_at).await })
    }

    fn health_check(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let storage = self.storage.clone();
        Box::pin(async move { storage.health_check().await })
    }
}

pub mod memory {
    //! In-memory store implementation.
    //!
    //! Keeps all collections in process behind `RwLock`ed maps with the same
    //! transition guards as the PostgreSQL implementation. Serves two
    //! masters: the demo deployment (no database configured) and the test
    //! suites, which get deterministic storage without infrastructure.

    use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc};

    use chrono::{DateTime, Utc};
    use tokio::sync::RwLock;

    use super::{
        AvailableGood, AvailableGoodId, AvailablePolicy, AvailablePolicyId, Customer, CustomerId,
        InspectionRef, Policy, PolicyGood, PolicyId, PolicyStatus, RecordStore, User, UserId,
    };
    use crate::error::{CoreError, Result};

    /// In-memory record store.
    ///
    /// Cloning is cheap and clones share state, mirroring how the pool-backed
    /// store behaves across handler invocations.
    #[derive(Clone, Default)]
    pub struct MemoryStore {
        policies: Arc<RwLock<HashMap<PolicyId, Policy>>>,
        customers: Arc<RwLock<HashMap<CustomerId, Customer>>>,
        available_goods: Arc<RwLock<HashMap<AvailableGoodId, AvailableGood>>>,
        available_policies: Arc<RwLock<HashMap<AvailablePolicyId, AvailablePolicy>>>,
        users: Arc<RwLock<HashMap<UserId, User>>>,
        processed_events: Arc<RwLock<HashMap<String, DateTime<Utc>>>>,
    }

    impl MemoryStore {
        /// Creates a new store with empty collections.
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl RecordStore for MemoryStore {
        fn create_policy(
            &self,
            policy: Policy,
        ) -> Pin<Box<dyn Future<Output = Result<PolicyId>> + Send + '_>> {
            let policies = self.policies.clone();
            Box::pin(async move {
                let id = policy.id;
                policies.write().await.insert(id, policy);
                Ok(id)
            })
        }

        fn find_policy(
            &self,
            policy_id: PolicyId,
        ) -> Pin<Box<dyn Future<Output = Result<Option<Policy>>> + Send + '_>> {
            let policies = self.policies.clone();
            Box::pin(async move { Ok(policies.read().await.get(&policy_id).cloned()) })
        }

        fn attach_inspection(
            &self,
            policy_id: PolicyId,
            inspection_id: InspectionRef,
        ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
            let policies = self.policies.clone();
            Box::pin(async move {
                let mut policies = policies.write().await;
                match policies.get_mut(&policy_id) {
                    Some(policy) if policy.status == PolicyStatus::PendingInspection => {
                        policy.status = PolicyStatus::WaitingVerification;
                        policy.inspection_id = Some(inspection_id);
                        policy.updated_at = Utc::now();
                        Ok(true)
                    },
                    _ => Ok(false),
                }
            })
        }

        fn mark_inspection_failed(
            &self,
            policy_id: PolicyId,
        ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
            let policies = self.policies.clone();
            Box::pin(async move {
                let mut policies = policies.write().await;
                match policies.get_mut(&policy_id) {
                    Some(policy) if policy.status == PolicyStatus::PendingInspection => {
                        policy.status = PolicyStatus::InspectionFailed;
                        policy.updated_at = Utc::now();
                        Ok(true)
                    },
                    _ => Ok(false),
                }
            })
        }

        fn append_goods(
            &self,
            policy_id: PolicyId,
            goods: Vec<PolicyGood>,
        ) -> Pin<Box<dyn Future<Output = Result<Policy>> + Send + '_>> {
            let policies = self.policies.clone();
            Box::pin(async move {
                let mut policies = policies.write().await;
                let policy = policies
                    .get_mut(&policy_id)
                    .ok_or_else(|| CoreError::not_found("policy", policy_id))?;
                policy.goods.0.extend(goods);
                policy.updated_at = Utc::now();
                Ok(policy.clone())
            })
        }

        fn complete_verification(
            &self,
            policy_id: PolicyId,
            status: PolicyStatus,
            start_date: Option<DateTime<Utc>>,
        ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
            let policies = self.policies.clone();
            Box::pin(async move {
                let mut policies = policies.write().await;
                match policies.get_mut(&policy_id) {
                    Some(policy) if policy.status == PolicyStatus::WaitingVerification => {
                        policy.status = status;
                        policy.start_date = start_date;
                        policy.updated_at = Utc::now();
                        Ok(true)
                    },
                    _ => Ok(false),
                }
            })
        }

        fn create_customer(
            &self,
            customer: Customer,
        ) -> Pin<Box<dyn Future<Output = Result<CustomerId>> + Send + '_>> {
            let customers = self.customers.clone();
            Box::pin(async move {
                let id = customer.id;
                customers.write().await.insert(id, customer);
                Ok(id)
            })
        }

        fn create_available_good(
            &self,
            good: AvailableGood,
        ) -> Pin<Box<dyn Future<Output = Result<AvailableGoodId>> + Send + '_>> {
            let goods = self.available_goods.clone();
            Box::pin(async move {
                let id = good.id;
                goods.write().await.insert(id, good);
                Ok(id)
            })
        }

        fn create_available_policy(
            &self,
            template: AvailablePolicy,
        ) -> Pin<Box<dyn Future<Output = Result<AvailablePolicyId>> + Send + '_>> {
            let templates = self.available_policies.clone();
            Box::pin(async move {
                let id = template.id;
                templates.write().await.insert(id, template);
                Ok(id)
            })
        }

        fn find_available_policy(
            &self,
            id: AvailablePolicyId,
        ) -> Pin<Box<dyn Future<Output = Result<Option<AvailablePolicy>>> + Send + '_>> {
            let templates = self.available_policies.clone();
            Box::pin(async move { Ok(templates.read().await.get(&id).cloned()) })
        }

        fn find_available_goods(
            &self,
            ids: Vec<AvailableGoodId>,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<AvailableGood>>> + Send + '_>> {
            let goods = self.available_goods.clone();
            Box::pin(async move {
                let goods = goods.read().await;
                Ok(ids.iter().filter_map(|id| goods.get(id).cloned()).collect())
            })
        }

        fn list_available_goods(
            &self,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<AvailableGood>>> + Send + '_>> {
            let goods = self.available_goods.clone();
            Box::pin(async move {
                let mut all: Vec<AvailableGood> = goods.read().await.values().cloned().collect();
                all.sort_by(|a, b| (&a.category, &a.kind).cmp(&(&b.category, &b.kind)));
                Ok(all)
            })
        }

        fn list_available_policies(
            &self,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<AvailablePolicy>>> + Send + '_>> {
            let templates = self.available_policies.clone();
            Box::pin(async move {
                let mut all: Vec<AvailablePolicy> =
                    templates.read().await.values().cloned().collect();
                all.sort_by(|a, b| a.name.cmp(&b.name));
                Ok(all)
            })
        }

        fn catalog_is_empty(&self) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
            let goods = self.available_goods.clone();
            let templates = self.available_policies.clone();
            Box::pin(async move {
                Ok(goods.read().await.is_empty() && templates.read().await.is_empty())
            })
        }

        fn create_user(
            &self,
            user: User,
        ) -> Pin<Box<dyn Future<Output = Result<UserId>> + Send + '_>> {
            let users = self.users.clone();
            Box::pin(async move {
                let id = user.id;
                users.write().await.insert(id, user);
                Ok(id)
            })
        }

        fn find_user(
            &self,
            user_id: UserId,
        ) -> Pin<Box<dyn Future<Output = Result<Option<User>>> + Send + '_>> {
            let users = self.users.clone();
            Box::pin(async move { Ok(users.read().await.get(&user_id).cloned()) })
        }

        fn attach_user_inspection(
            &self,
            user_id: UserId,
            inspection_id: InspectionRef,
        ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
            let users = self.users.clone();
            Box::pin(async move {
                match users.write().await.get_mut(&user_id) {
                    Some(user) => {
                        user.inspection_id = Some(inspection_id);
                        Ok(true)
                    },
                    None => Ok(false),
                }
            })
        }

        fn mark_user_verified(
            &self,
            user_id: UserId,
        ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
            let users = self.users.clone();
            Box::pin(async move {
                match users.write().await.get_mut(&user_id) {
                    Some(user) if !user.verified => {
                        user.verified = true;
                        Ok(true)
                    },
                    _ => Ok(false),
                }
            })
        }

        fn record_processed_event(
            &self,
            event_id: String,
            processed_at: DateTime<Utc>,
        ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
            let processed = self.processed_events.clone();
            Box::pin(async move {
                let mut ledger = processed.write().await;
                if ledger.contains_key(&event_id) {
                    return Ok(false);
                }
                ledger.insert(event_id, processed_at);
                Ok(true)
            })
        }

        fn health_check(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
            Box::pin(async move { Ok(()) })
        }
    }
}
