use regex::Regex;
use std::sync::RwLock;

use crate::error::Error;

/// Current caller identity as exposed by the wallet connection
pub trait IdentityProvider: Send + Sync {
    /// Address of the connected account, if any
    fn address(&self) -> Option<String>;

    /// Whether a wallet is connected
    fn is_connected(&self) -> bool;

    /// The caller address when a wallet is connected and authenticated
    fn authenticated_address(&self) -> Option<String> {
        if self.is_connected() {
            self.address()
        } else {
            None
        }
    }
}

/// In-process wallet session holding the connected account
pub struct WalletSession {
    account: RwLock<Option<String>>,
    address_format: Regex,
}

impl WalletSession {
    /// Create a disconnected session
    pub fn new() -> Self {
        Self {
            account: RwLock::new(None),
            // 20-byte EVM address
            address_format: Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("static regex"),
        }
    }

    /// Create a session already connected to `address`
    pub fn connected(address: &str) -> Result<Self, Error> {
        let session = Self::new();
        session.connect(address)?;
        Ok(session)
    }

    /// Connect an account
    pub fn connect(&self, address: &str) -> Result<(), Error> {
        let address = address.trim();
        if !self.address_format.is_match(address) {
            return Err(Error::Wallet(format!("Invalid address: {}", address)));
        }
        let mut account = self
            .account
            .write()
            .map_err(|_| Error::Wallet("Wallet session lock poisoned".to_string()))?;
        *account = Some(address.to_string());
        tracing::info!(address, "wallet connected");
        Ok(())
    }

    /// Drop the connected account
    pub fn disconnect(&self) {
        if let Ok(mut account) = self.account.write() {
            if account.take().is_some() {
                tracing::info!("wallet disconnected");
            }
        }
    }
}

impl Default for WalletSession {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for WalletSession {
    fn address(&self) -> Option<String> {
        self.account.read().ok().and_then(|a| a.clone())
    }

    fn is_connected(&self) -> bool {
        self.account.read().map(|a| a.is_some()).unwrap_or(false)
    }
}
