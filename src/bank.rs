//! Account storage behind the [`Bank`] trait.
//!
//! [`Ledger`] keeps accounts in memory, hashes PINs with a salted SHA-256 and
//! can persist itself as YAML. Rejected transactions are [`TransactionError`]
//! values; only I/O problems surface as [`crate::Error`].

use crate::{
    config::SecurityConfig,
    constants::{
        ACCOUNT_NUMBER_LENGTH, DEFAULT_MAX_AMOUNT, DEFAULT_MAX_PIN_ATTEMPTS, DEFAULT_PIN_SALT,
        DEMO_ACCOUNT_BALANCE, DEMO_ACCOUNT_HOLDER, DEMO_ACCOUNT_NUMBER, DEMO_ACCOUNT_PIN,
        NEW_ACCOUNT_OPENING_BALANCE,
    },
    pin::check_pin_format,
    Error, Result,
};
use log::{info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Why the bank refused a request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("account {0} does not exist")]
    AccountNotFound(String),
    #[error("account {0} is frozen")]
    AccountFrozen(String),
    #[error("incorrect PIN, {remaining} attempts left")]
    IncorrectPin { remaining: u32 },
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("amount must be between 1 and {max}")]
    AmountOutOfRange { max: u64 },
    #[error("cannot transfer to the source account")]
    SameAccount,
    #[error("invalid account holder name")]
    InvalidName,
    #[error("no free account number")]
    AccountNumbersExhausted,
}

impl TransactionError {
    /// Message key shown on the result screen
    #[must_use]
    pub const fn message_key(&self) -> &'static str {
        match self {
            Self::AccountNotFound(_) => "error.account.not_found",
            Self::AccountFrozen(_) => "error.account.frozen",
            Self::IncorrectPin { remaining: 0 } => "error.pin.locked",
            Self::IncorrectPin { .. } => "error.pin.incorrect",
            Self::InsufficientFunds => "error.balance.insufficient",
            Self::AmountOutOfRange { .. } => "error.amount.range",
            Self::SameAccount => "error.transfer.same_account",
            Self::InvalidName => "error.name.invalid",
            Self::AccountNumbersExhausted => "error.account.create_failed",
        }
    }
}

/// Result type of bank operations
pub type TransactionResult<T> = std::result::Result<T, TransactionError>;

/// Bank collaborator used by the flow controller
pub trait Bank {
    /// Whether an account number is known
    fn account_exists(&self, account: &str) -> bool;

    /// Account holder's name
    fn holder_name(&self, account: &str) -> Option<String>;

    /// Current balance
    fn balance(&self, account: &str) -> Option<u64>;

    /// Whether too many wrong PINs have locked the account
    fn is_frozen(&self, account: &str) -> bool;

    /// Check a PIN; wrong PINs count towards freezing the account
    fn verify_pin(&mut self, account: &str, pin: &str) -> TransactionResult<()>;

    /// Debit `amount`; returns the new balance
    fn withdraw(&mut self, account: &str, pin: &str, amount: u64) -> TransactionResult<u64>;

    /// Move `amount` from `source` to `target`; returns the new source balance
    fn transfer(&mut self, source: &str, pin: &str, target: &str, amount: u64) -> TransactionResult<u64>;

    /// Open an account; returns its number
    fn create_account(&mut self, holder: &str, pin: &str) -> TransactionResult<String>;
}

/// Stored account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub holder: String,
    pub pin_hash: String,
    pub balance: u64,
    #[serde(default)]
    pub failed_attempts: u32,
    #[serde(default)]
    pub frozen: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    accounts: BTreeMap<String, AccountRecord>,
}

/// In-memory [`Bank`] with optional YAML persistence
#[derive(Debug, Clone)]
pub struct Ledger {
    accounts: BTreeMap<String, AccountRecord>,
    salt: String,
    max_amount: u64,
    max_pin_attempts: u32,
    path: Option<PathBuf>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(DEFAULT_PIN_SALT, DEFAULT_MAX_AMOUNT, DEFAULT_MAX_PIN_ATTEMPTS)
    }
}

impl Ledger {
    /// Empty in-memory ledger
    #[must_use]
    pub fn new(salt: &str, max_amount: u64, max_pin_attempts: u32) -> Self {
        assert!(max_pin_attempts > 0, "PIN attempts must be greater than 0");
        Self {
            accounts: BTreeMap::new(),
            salt: salt.to_string(),
            max_amount,
            max_pin_attempts,
            path: None,
        }
    }

    /// In-memory ledger holding only the demo account
    #[must_use]
    pub fn with_demo_account(mut self) -> Self {
        self.seed_demo_account();
        self
    }

    /// Ledger for the `security` configuration section
    pub fn from_config(config: &SecurityConfig) -> Result<Self> {
        let ledger = Self::new(&config.pin_salt, config.max_amount, config.max_pin_attempts);
        match &config.ledger_path {
            Some(path) => ledger.open(path),
            None => Ok(ledger.with_demo_account()),
        }
    }

    /// Attach a YAML file; loads it when present, otherwise seeds the demo account and writes it
    pub fn open<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if path.exists() {
            let contents = fs::read_to_string(&path)?;
            let file: LedgerFile = serde_yaml::from_str(&contents)?;
            self.accounts = file.accounts;
            info!("Loaded {} accounts from {}", self.accounts.len(), path.display());
            self.path = Some(path);
        } else {
            self.seed_demo_account();
            self.path = Some(path);
            self.save()?;
            info!("Created ledger with demo account");
        }
        Ok(self)
    }

    /// Write the ledger to its file, if it has one
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = LedgerFile {
            accounts: self.accounts.clone(),
        };
        let yaml = serde_yaml::to_string(&file)?;
        fs::write(path, yaml).map_err(|e| Error::Ledger(format!("{}: {}", path.display(), e)))
    }

    /// Add an account with a known number (replaces an existing one)
    pub fn insert_account(&mut self, number: &str, holder: &str, pin: &str, balance: u64) {
        let record = AccountRecord {
            holder: holder.to_string(),
            pin_hash: self.hash_pin(pin),
            balance,
            failed_attempts: 0,
            frozen: false,
        };
        self.accounts.insert(number.to_string(), record);
    }

    /// Stored record, for inspection
    #[must_use]
    pub fn account(&self, number: &str) -> Option<&AccountRecord> {
        self.accounts.get(number)
    }

    /// Number of stored accounts
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Per-transaction limit
    #[must_use]
    pub fn max_amount(&self) -> u64 {
        self.max_amount
    }

    fn seed_demo_account(&mut self) {
        self.insert_account(
            DEMO_ACCOUNT_NUMBER,
            DEMO_ACCOUNT_HOLDER,
            DEMO_ACCOUNT_PIN,
            DEMO_ACCOUNT_BALANCE,
        );
    }

    fn hash_pin(&self, pin: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.salt.as_bytes());
        hasher.update(pin.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn check_amount(&self, amount: u64) -> TransactionResult<()> {
        if amount == 0 || amount > self.max_amount {
            return Err(TransactionError::AmountOutOfRange { max: self.max_amount });
        }
        Ok(())
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            warn!("Failed to persist ledger: {}", e);
        }
    }
}

impl Bank for Ledger {
    fn account_exists(&self, account: &str) -> bool {
        self.accounts.contains_key(account)
    }

    fn holder_name(&self, account: &str) -> Option<String> {
        self.accounts.get(account).map(|r| r.holder.clone())
    }

    fn balance(&self, account: &str) -> Option<u64> {
        self.accounts.get(account).map(|r| r.balance)
    }

    fn is_frozen(&self, account: &str) -> bool {
        self.accounts.get(account).map_or(false, |r| r.frozen)
    }

    fn verify_pin(&mut self, account: &str, pin: &str) -> TransactionResult<()> {
        let hash = self.hash_pin(pin);
        let max_attempts = self.max_pin_attempts;
        let record = self
            .accounts
            .get_mut(account)
            .ok_or_else(|| TransactionError::AccountNotFound(account.to_string()))?;

        if record.frozen {
            return Err(TransactionError::AccountFrozen(account.to_string()));
        }

        if record.pin_hash == hash {
            if record.failed_attempts > 0 {
                record.failed_attempts = 0;
                self.persist();
            }
            return Ok(());
        }

        record.failed_attempts += 1;
        let remaining = max_attempts.saturating_sub(record.failed_attempts);
        if remaining == 0 {
            record.frozen = true;
            warn!("Account {} frozen after {} wrong PINs", account, record.failed_attempts);
        }
        self.persist();
        Err(TransactionError::IncorrectPin { remaining })
    }

    fn withdraw(&mut self, account: &str, pin: &str, amount: u64) -> TransactionResult<u64> {
        self.check_amount(amount)?;
        self.verify_pin(account, pin)?;

        let record = self
            .accounts
            .get_mut(account)
            .ok_or_else(|| TransactionError::AccountNotFound(account.to_string()))?;
        if record.balance < amount {
            return Err(TransactionError::InsufficientFunds);
        }
        record.balance -= amount;
        let balance = record.balance;
        info!("Withdrawal of {} from {}", amount, account);
        self.persist();
        Ok(balance)
    }

    fn transfer(&mut self, source: &str, pin: &str, target: &str, amount: u64) -> TransactionResult<u64> {
        self.check_amount(amount)?;
        if source == target {
            return Err(TransactionError::SameAccount);
        }
        if !self.accounts.contains_key(target) {
            return Err(TransactionError::AccountNotFound(target.to_string()));
        }
        self.verify_pin(source, pin)?;

        let source_record = self
            .accounts
            .get_mut(source)
            .ok_or_else(|| TransactionError::AccountNotFound(source.to_string()))?;
        if source_record.balance < amount {
            return Err(TransactionError::InsufficientFunds);
        }
        source_record.balance -= amount;
        let balance = source_record.balance;

        if let Some(target_record) = self.accounts.get_mut(target) {
            target_record.balance = target_record.balance.saturating_add(amount);
        }
        info!("Transfer of {} from {} to {}", amount, source, target);
        self.persist();
        Ok(balance)
    }

    fn create_account(&mut self, holder: &str, pin: &str) -> TransactionResult<String> {
        let holder = holder.trim();
        if holder.is_empty() {
            return Err(TransactionError::InvalidName);
        }
        if check_pin_format(pin).is_err() {
            return Err(TransactionError::IncorrectPin {
                remaining: self.max_pin_attempts,
            });
        }

        let low = 10u32.pow(ACCOUNT_NUMBER_LENGTH as u32 - 1);
        let high = 10u32.pow(ACCOUNT_NUMBER_LENGTH as u32);
        let mut rng = rand::thread_rng();
        let number = (0..1000)
            .map(|_| rng.gen_range(low..high).to_string())
            .find(|n| !self.accounts.contains_key(n))
            .ok_or(TransactionError::AccountNumbersExhausted)?;

        self.insert_account(&number, holder, pin, NEW_ACCOUNT_OPENING_BALANCE);
        info!("Created account {} for {}", number, holder);
        self.persist();
        Ok(number)
    }
}
