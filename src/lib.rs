pub mod app;
pub mod config;
pub mod contract;
pub mod devnet;
pub mod error;
pub mod fhe;
pub mod ledger;
pub mod logging;
pub mod notifier;
pub mod registry;
pub mod view;
pub mod wallet;
pub mod workflow;

pub use app::App;
pub use config::{Config, NetworkConfig, WorkflowConfig};
pub use contract::{Handle, PendingSubmission, PoolData, PoolReader, PoolWriter, Receipt};
pub use devnet::LocalDevnet;
pub use error::{ContractError, Error, FheError, WorkflowError};
pub use fhe::{DecryptionVerifier, Encryptor, FheRuntime};
pub use ledger::{TradeLedger, TradeRecord};
pub use logging::{setup_logging, LoggingConfig};
pub use notifier::{StatusNotifier, StatusPhase, WorkflowStatus};
pub use registry::{PoolRecord, PoolRegistry, PoolStats};
pub use view::{Tab, ViewState};
pub use wallet::{IdentityProvider, WalletSession};
pub use workflow::{
    Collaborators, CreatePoolParams, DecryptOutcome, Operation, SwapParams, TransactionWorkflow,
};
