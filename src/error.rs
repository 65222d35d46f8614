use thiserror::Error;

/// SDK Error type
#[derive(Error, Debug)]
pub enum Error {
    /// Contract collaborator error
    #[error("Contract error: {0}")]
    Contract(#[from] ContractError),

    /// FHE collaborator error
    #[error("FHE error: {0}")]
    Fhe(#[from] FheError),

    /// Workflow operation error
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    /// Wallet error
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration loader error
    #[error("Configuration loader error: {0}")]
    ConfigLoader(#[from] config::ConfigError),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure kinds reported by the contract collaborators.
///
/// Wallet and contract libraries usually only surface a message; adapters
/// turn those into a kind with [`ContractError::classify`] so the workflow
/// never has to look at message text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    /// The wallet prompt was refused by the user
    #[error("user rejected transaction: {0}")]
    UserRejected(String),

    /// The pool's cleartext has already been recorded on-chain
    #[error("Data already verified: {0}")]
    AlreadyVerified(String),

    /// Unknown pool identifier
    #[error("Pool not found: {0}")]
    NotFound(String),

    /// The contract reverted the call
    #[error("Execution reverted: {0}")]
    Reverted(String),

    /// RPC or connection level failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The submission was accepted but never confirmed successfully
    #[error("Confirmation failed: {0}")]
    Confirmation(String),
}

impl ContractError {
    /// Map a raw collaborator message to a failure kind.
    pub fn classify(message: &str) -> Self {
        let lowered = message.to_lowercase();
        if lowered.contains("user rejected") || lowered.contains("user denied") {
            ContractError::UserRejected(message.to_string())
        } else if lowered.contains("already verified") {
            ContractError::AlreadyVerified(message.to_string())
        } else if lowered.contains("not found") || lowered.contains("does not exist") {
            ContractError::NotFound(message.to_string())
        } else if lowered.contains("revert") {
            ContractError::Reverted(message.to_string())
        } else {
            ContractError::Transport(message.to_string())
        }
    }

    pub fn is_user_rejection(&self) -> bool {
        matches!(self, ContractError::UserRejected(_))
    }

    pub fn is_already_verified(&self) -> bool {
        matches!(self, ContractError::AlreadyVerified(_))
    }
}

/// Failure kinds reported by the FHE client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FheError {
    /// The FHE runtime was used before `initialize` completed
    #[error("FHE runtime is not initialized")]
    NotInitialized,

    /// Runtime initialization failed
    #[error("FHE initialization failed: {0}")]
    Initialization(String),

    /// Encrypting an input failed
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// The decryption attestation round trip failed
    #[error("Decryption verification failed: {0}")]
    Verification(String),

    /// The finalize callback's on-chain submission failed
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl FheError {
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, FheError::Contract(e) if e.is_user_rejection())
    }

    pub fn is_already_verified(&self) -> bool {
        matches!(self, FheError::Contract(e) if e.is_already_verified())
    }
}

/// Terminal errors of the transaction workflow operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// No authenticated wallet identity; nothing was submitted
    #[error("Wallet is not connected")]
    NotConnected,

    /// A previous invocation of the same operation is still outstanding
    #[error("{0} is already in progress")]
    InFlight(&'static str),

    /// The request is incomplete (empty pair or amounts)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The user refused the wallet prompt
    #[error("Transaction rejected by user")]
    UserRejected,

    /// Encryption, signing or submission failed before confirmation
    #[error("Submission failed: {0}")]
    SubmissionFailed(String),

    /// The submission was not confirmed
    #[error("Confirmation failed: {0}")]
    ConfirmationFailed(String),
}

impl WorkflowError {
    /// Classify a failure raised while submitting
    pub fn from_submission(err: &Error) -> Self {
        if Self::is_rejection(err) {
            WorkflowError::UserRejected
        } else {
            WorkflowError::SubmissionFailed(err.to_string())
        }
    }

    /// Classify a failure raised while awaiting confirmation
    pub fn from_confirmation(err: &Error) -> Self {
        if Self::is_rejection(err) {
            WorkflowError::UserRejected
        } else {
            WorkflowError::ConfirmationFailed(err.to_string())
        }
    }

    fn is_rejection(err: &Error) -> bool {
        match err {
            Error::Contract(e) => e.is_user_rejection(),
            Error::Fhe(e) => e.is_user_rejection(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_messages() {
        assert!(ContractError::classify("MetaMask: user rejected transaction").is_user_rejection());
        assert!(ContractError::classify("execution reverted: Data already verified")
            .is_already_verified());
        assert_eq!(
            ContractError::classify("pool does not exist"),
            ContractError::NotFound("pool does not exist".to_string())
        );
        assert!(matches!(
            ContractError::classify("execution reverted: bad proof"),
            ContractError::Reverted(_)
        ));
        assert!(matches!(
            ContractError::classify("socket hang up"),
            ContractError::Transport(_)
        ));
    }

    #[test]
    fn test_nested_fhe_contract_errors() {
        let err = FheError::from(ContractError::AlreadyVerified("dup".into()));
        assert!(err.is_already_verified());
        assert!(!err.is_user_rejection());

        let err = FheError::Verification("gateway down".into());
        assert!(!err.is_already_verified());
    }

    #[test]
    fn test_workflow_error_classification() {
        let rejected = Error::from(ContractError::UserRejected("no".into()));
        assert_eq!(
            WorkflowError::from_submission(&rejected),
            WorkflowError::UserRejected
        );
        assert_eq!(
            WorkflowError::from_confirmation(&rejected),
            WorkflowError::UserRejected
        );

        let failed = Error::from(ContractError::Confirmation("dropped".into()));
        assert!(matches!(
            WorkflowError::from_confirmation(&failed),
            WorkflowError::ConfirmationFailed(_)
        ));
        assert!(matches!(
            WorkflowError::from_submission(&failed),
            WorkflowError::SubmissionFailed(_)
        ));
    }
}
