//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.
//! Compound operations take an internal write lock for their full
//! read-check-write span, then commit one `WriteBatch`, so concurrent
//! mutations serialize and no partial state is ever visible.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};

use coin_ledger_core::{
    next_balance, Account, AccountPatch, Actor, EntryId, EntryType, FulfillmentRecord, Invite,
    LedgerEntry, Membership, PaymentId, PaymentRecord, PaymentStatus, Product, PurchaseMutation,
    Room, RoomId, UserId, VipTier, WalletConfig, WalletError,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf, WALLET_CONFIG_KEY};
use crate::{FinalizeOutcome, RedeemOutcome, Store};

/// `RocksDB`-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,

    // Serializes compound read-modify-write operations. Plain puts and reads
    // do not take it.
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Acquire the compound-operation lock.
    fn lock_writes(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Database("write lock poisoned".into()))
    }

    fn balance_error(e: WalletError) -> StoreError {
        match e {
            WalletError::InsufficientBalance { balance, required } => {
                StoreError::InsufficientBalance { balance, required }
            }
            WalletError::InvalidArgument(msg) => StoreError::InvalidArgument(msg),
            other => StoreError::Database(other.to_string()),
        }
    }

    fn get_entry(&self, entry_id: &EntryId) -> Result<Option<LedgerEntry>> {
        let cf = self.cf(cf::LEDGER)?;
        let key = keys::entry_key(entry_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Stage a payment record plus its indexes into a batch.
    fn stage_payment(&self, batch: &mut WriteBatch, payment: &PaymentRecord) -> Result<()> {
        let cf_payments = self.cf(cf::PAYMENTS)?;
        let cf_by_user = self.cf(cf::PAYMENTS_BY_USER)?;

        let value = Self::serialize(payment)?;
        batch.put_cf(&cf_payments, keys::payment_key(&payment.id), &value);
        batch.put_cf(
            &cf_by_user,
            keys::user_payment_key(&payment.user_id, &payment.id),
            [],
        );

        if let Some(token) = &payment.meta.purchase_token {
            let cf_by_token = self.cf(cf::PAYMENTS_BY_TOKEN)?;
            batch.put_cf(&cf_by_token, keys::token_key(token), payment.id.to_bytes());
        }

        Ok(())
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Account Operations
    // =========================================================================

    fn put_account(&self, account: &Account) -> Result<()> {
        let cf = self.cf(cf::ACCOUNTS)?;
        let key = keys::account_key(&account.user_id);
        let value = Self::serialize(account)?;

        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get_account(&self, user_id: &UserId) -> Result<Option<Account>> {
        let cf = self.cf(cf::ACCOUNTS)?;
        let key = keys::account_key(user_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    // =========================================================================
    // Wallet Transactions
    // =========================================================================

    fn apply_wallet_txn(
        &self,
        user_id: &UserId,
        entry_type: EntryType,
        delta: i64,
        note: &str,
        actor: Actor,
        vip_tier: Option<VipTier>,
    ) -> Result<(i64, EntryId)> {
        let _guard = self.lock_writes()?;
        let now = Utc::now();

        // Merge-create: the first transaction for a user creates the account.
        let mut account = self
            .get_account(user_id)?
            .unwrap_or_else(|| Account::new(*user_id));

        let balance = next_balance(account.balance, delta).map_err(Self::balance_error)?;
        account.balance = balance;
        account.updated_at = now;

        if entry_type == EntryType::VipUpgrade {
            if let Some(tier) = vip_tier {
                // Tier only ever moves up.
                if tier.rank() > account.vip_tier.rank() {
                    account.vip_tier = tier;
                    account.vip_since = Some(now);
                }
            }
        }

        let entry = LedgerEntry::new(*user_id, entry_type, delta, balance, note.to_string(), actor);

        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let cf_ledger = self.cf(cf::LEDGER)?;
        let cf_by_user = self.cf(cf::LEDGER_BY_USER)?;

        let account_value = Self::serialize(&account)?;
        let entry_value = Self::serialize(&entry)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_accounts, keys::account_key(user_id), &account_value);
        batch.put_cf(&cf_ledger, keys::entry_key(&entry.id), &entry_value);
        batch.put_cf(&cf_by_user, keys::user_entry_key(user_id, &entry.id), []);

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok((balance, entry.id))
    }

    fn list_entries_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>> {
        let cf_by_user = self.cf(cf::LEDGER_BY_USER)?;
        let prefix = keys::user_prefix(user_id);

        let iter = self.db.iterator_cf(
            &cf_by_user,
            IteratorMode::From(&prefix, rocksdb::Direction::Forward),
        );

        // ULIDs are time-ordered, so the prefix range is chronological.
        let mut all_keys: Vec<Vec<u8>> = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            if !key.starts_with(&prefix) {
                break;
            }

            all_keys.push(key.to_vec());
        }

        // Reverse to get newest first.
        all_keys.reverse();

        let mut entries = Vec::new();
        for key in all_keys.into_iter().skip(offset) {
            if entries.len() >= limit {
                break;
            }

            let entry_id = keys::extract_entry_id_from_user_key(&key);
            if let Some(entry) = self.get_entry(&entry_id)? {
                entries.push(entry);
            }
        }

        Ok(entries)
    }

    // =========================================================================
    // Payments
    // =========================================================================

    fn put_payment(&self, payment: &PaymentRecord) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.stage_payment(&mut batch, payment)?;

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get_payment(&self, payment_id: &PaymentId) -> Result<Option<PaymentRecord>> {
        let cf = self.cf(cf::PAYMENTS)?;
        let key = keys::payment_key(payment_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn get_payment_by_token(&self, purchase_token: &str) -> Result<Option<PaymentRecord>> {
        let cf = self.cf(cf::PAYMENTS_BY_TOKEN)?;
        let key = keys::token_key(purchase_token);

        let Some(data) = self
            .db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };

        let bytes: [u8; 16] = data
            .as_slice()
            .try_into()
            .map_err(|_| StoreError::Serialization("malformed token index value".into()))?;
        let payment_id =
            PaymentId::from_bytes(bytes).map_err(|e| StoreError::Serialization(e.to_string()))?;

        self.get_payment(&payment_id)
    }

    fn completed_coins_since(&self, user_id: &UserId, since: DateTime<Utc>) -> Result<i64> {
        let cf_by_user = self.cf(cf::PAYMENTS_BY_USER)?;
        let prefix = keys::user_prefix(user_id);

        let iter = self.db.iterator_cf(
            &cf_by_user,
            IteratorMode::From(&prefix, rocksdb::Direction::Forward),
        );

        let mut total = 0i64;
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            if !key.starts_with(&prefix) {
                break;
            }

            let payment_id = keys::extract_payment_id_from_user_key(&key);
            let Some(payment) = self.get_payment(&payment_id)? else {
                continue;
            };

            if payment.is_completed() && payment.completed_at.is_some_and(|at| at >= since) {
                total += payment.coins;
            }
        }

        Ok(total)
    }

    // =========================================================================
    // Fulfillment
    // =========================================================================

    fn get_fulfillment(&self, event_id: &str) -> Result<Option<FulfillmentRecord>> {
        let cf = self.cf(cf::FULFILLMENTS)?;
        let key = keys::fulfillment_key(event_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn finalize_purchase(
        &self,
        event_id: &str,
        payment: &PaymentRecord,
        mutation: &PurchaseMutation,
        note: &str,
    ) -> Result<FinalizeOutcome> {
        let _guard = self.lock_writes()?;

        // Re-check the guard under the lock: redelivered events are no-ops.
        if let Some(existing) = self.get_fulfillment(event_id)? {
            if existing.fulfilled {
                return Ok(FinalizeOutcome::AlreadyFulfilled);
            }
        }

        let now = Utc::now();
        let mut account = self
            .get_account(&payment.user_id)?
            .unwrap_or_else(|| Account::new(payment.user_id));

        let mut amount = 0i64;
        let mut patch = AccountPatch::default();
        match mutation {
            PurchaseMutation::CreditCoins(coins) => amount = *coins,
            PurchaseMutation::UpgradeVip(tier) => patch.vip_tier = Some(*tier),
            PurchaseMutation::GrantEntitlement(product_id) => {
                patch.entitlements.insert(product_id.clone(), true);
            }
            PurchaseMutation::Noop { .. } => {}
        }

        let balance = if amount == 0 {
            account.balance
        } else {
            next_balance(account.balance, amount).map_err(Self::balance_error)?
        };
        account.balance = balance;
        patch.apply(&mut account, now);

        let metadata = serde_json::json!({
            "payment_id": payment.id.to_string(),
            "provider": payment.provider.as_str(),
            "product_id": payment.product_id,
        });
        let entry = LedgerEntry::purchase(
            payment.user_id,
            amount,
            balance,
            note.to_string(),
            metadata,
        );

        let mut completed = payment.clone();
        completed.status = PaymentStatus::Completed;
        completed.completed_at = Some(now);

        let guard = FulfillmentRecord {
            event_id: event_id.to_string(),
            fulfilled: true,
            payment_id: payment.id,
            entry_id: Some(entry.id),
            product_id: payment.product_id.clone(),
            created_at: now,
            fulfilled_at: Some(now),
        };

        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let cf_ledger = self.cf(cf::LEDGER)?;
        let cf_ledger_by_user = self.cf(cf::LEDGER_BY_USER)?;
        let cf_fulfillments = self.cf(cf::FULFILLMENTS)?;

        let account_value = Self::serialize(&account)?;
        let entry_value = Self::serialize(&entry)?;
        let guard_value = Self::serialize(&guard)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            &cf_accounts,
            keys::account_key(&payment.user_id),
            &account_value,
        );
        batch.put_cf(&cf_ledger, keys::entry_key(&entry.id), &entry_value);
        batch.put_cf(
            &cf_ledger_by_user,
            keys::user_entry_key(&payment.user_id, &entry.id),
            [],
        );
        self.stage_payment(&mut batch, &completed)?;
        batch.put_cf(
            &cf_fulfillments,
            keys::fulfillment_key(event_id),
            &guard_value,
        );

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(FinalizeOutcome::Applied {
            balance,
            entry_id: entry.id,
        })
    }

    // =========================================================================
    // Catalog & Config
    // =========================================================================

    fn put_product(&self, product: &Product) -> Result<()> {
        let cf = self.cf(cf::PRODUCTS)?;
        let key = keys::product_key(&product.id);
        let value = Self::serialize(product)?;

        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get_product(&self, product_id: &str) -> Result<Option<Product>> {
        let cf = self.cf(cf::PRODUCTS)?;
        let key = keys::product_key(product_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn list_products(&self) -> Result<Vec<Product>> {
        let cf = self.cf(cf::PRODUCTS)?;

        let mut products: Vec<Product> = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            products.push(Self::deserialize(&value)?);
        }

        products.sort_by(|a, b| a.sort.cmp(&b.sort).then_with(|| a.id.cmp(&b.id)));

        Ok(products)
    }

    fn put_wallet_config(&self, config: &WalletConfig) -> Result<()> {
        let cf = self.cf(cf::CONFIG)?;
        let value = Self::serialize(config)?;

        self.db
            .put_cf(&cf, WALLET_CONFIG_KEY, value)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get_wallet_config(&self) -> Result<Option<WalletConfig>> {
        let cf = self.cf(cf::CONFIG)?;

        self.db
            .get_cf(&cf, WALLET_CONFIG_KEY)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    // =========================================================================
    // Rooms & Memberships
    // =========================================================================

    fn create_room(&self, room: &Room) -> Result<()> {
        let cf_rooms = self.cf(cf::ROOMS)?;
        let cf_memberships = self.cf(cf::MEMBERSHIPS)?;

        let membership = Membership {
            user_id: room.created_by,
            room_id: room.id,
            display_name: None,
            joined_at: room.created_at,
        };

        let room_value = Self::serialize(room)?;
        let membership_value = Self::serialize(&membership)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_rooms, keys::room_key(&room.id), &room_value);
        batch.put_cf(
            &cf_memberships,
            keys::membership_key(&room.id, &room.created_by),
            &membership_value,
        );

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get_room(&self, room_id: &RoomId) -> Result<Option<Room>> {
        let cf = self.cf(cf::ROOMS)?;
        let key = keys::room_key(room_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn is_member(&self, room_id: &RoomId, user_id: &UserId) -> Result<bool> {
        let cf = self.cf(cf::MEMBERSHIPS)?;
        let key = keys::membership_key(room_id, user_id);

        let exists = self
            .db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .is_some();

        Ok(exists)
    }

    // =========================================================================
    // Invites
    // =========================================================================

    fn create_invite(&self, invite: &Invite) -> Result<()> {
        let _guard = self.lock_writes()?;

        if self.get_invite(&invite.code)?.is_some() {
            return Err(StoreError::CodeCollision {
                code: invite.code.clone(),
            });
        }

        let cf_invites = self.cf(cf::INVITES)?;
        let cf_by_room = self.cf(cf::INVITES_BY_ROOM)?;

        let value = Self::serialize(invite)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_invites, keys::invite_key(&invite.code), &value);
        batch.put_cf(
            &cf_by_room,
            keys::room_invite_key(&invite.room_id, &invite.code),
            [],
        );

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get_invite(&self, code: &str) -> Result<Option<Invite>> {
        let cf = self.cf(cf::INVITES)?;
        let key = keys::invite_key(code);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn list_invites_by_room(&self, room_id: &RoomId) -> Result<Vec<Invite>> {
        let cf_by_room = self.cf(cf::INVITES_BY_ROOM)?;
        let prefix = room_id.as_bytes().to_vec();

        let iter = self.db.iterator_cf(
            &cf_by_room,
            IteratorMode::From(&prefix, rocksdb::Direction::Forward),
        );

        let mut invites = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            if !key.starts_with(&prefix) {
                break;
            }

            let code = keys::extract_code_from_room_key(&key);
            if let Some(invite) = self.get_invite(&code)? {
                invites.push(invite);
            }
        }

        Ok(invites)
    }

    fn redeem_invite(
        &self,
        code: &str,
        user_id: &UserId,
        display_name: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<RedeemOutcome> {
        let _guard = self.lock_writes()?;

        let mut invite = self.get_invite(code)?.ok_or_else(|| StoreError::NotFound {
            entity: "invite",
            id: code.to_string(),
        })?;

        if invite.is_expired(now) {
            return Err(StoreError::InviteExpired {
                code: code.to_string(),
            });
        }

        let room_id = invite.room_id;

        // Members re-redeeming is a no-op: no counters move.
        if self.is_member(&room_id, user_id)? {
            return Ok(RedeemOutcome::AlreadyMember { room_id });
        }

        if invite.is_exhausted() {
            return Err(StoreError::InviteExhausted {
                code: code.to_string(),
            });
        }

        let mut room = self.get_room(&room_id)?.ok_or_else(|| StoreError::NotFound {
            entity: "room",
            id: room_id.to_string(),
        })?;

        invite.uses += 1;
        room.member_count += 1;

        let membership = Membership {
            user_id: *user_id,
            room_id,
            display_name,
            joined_at: now,
        };

        let cf_invites = self.cf(cf::INVITES)?;
        let cf_rooms = self.cf(cf::ROOMS)?;
        let cf_memberships = self.cf(cf::MEMBERSHIPS)?;

        let invite_value = Self::serialize(&invite)?;
        let room_value = Self::serialize(&room)?;
        let membership_value = Self::serialize(&membership)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_invites, keys::invite_key(code), &invite_value);
        batch.put_cf(&cf_rooms, keys::room_key(&room_id), &room_value);
        batch.put_cf(
            &cf_memberships,
            keys::membership_key(&room_id, user_id),
            &membership_value,
        );

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(RedeemOutcome::Joined {
            room_id,
            uses: invite.uses,
        })
    }
}
