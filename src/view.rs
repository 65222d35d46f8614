//! View and selection state
//!
//! Presentation state that front-ends bind to: active tab, form fields,
//! modal visibility, the selected pool and the ephemeral decrypted value.
//! None of it is persisted.

use crate::registry::PoolRecord;
use crate::workflow::{CreatePoolParams, SwapParams};

/// Main tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Swap,
    Pools,
    Stats,
}

impl Tab {
    pub fn display_name(&self) -> &'static str {
        match self {
            Tab::Swap => "Swap",
            Tab::Pools => "Pools",
            Tab::Stats => "Stats",
        }
    }

    pub fn all() -> Vec<Tab> {
        vec![Tab::Swap, Tab::Pools, Tab::Stats]
    }

    pub fn next(&self) -> Tab {
        match self {
            Tab::Swap => Tab::Pools,
            Tab::Pools => Tab::Stats,
            Tab::Stats => Tab::Swap,
        }
    }
}

impl std::str::FromStr for Tab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "swap" => Ok(Tab::Swap),
            "pools" => Ok(Tab::Pools),
            "stats" => Ok(Tab::Stats),
            _ => Err(format!("Unknown tab: {}", s)),
        }
    }
}

/// Swap form bindings
#[derive(Debug, Clone, PartialEq)]
pub struct SwapForm {
    pub input_token: String,
    pub output_token: String,
    pub input_amount: String,
    pub output_amount: String,
}

impl Default for SwapForm {
    fn default() -> Self {
        Self {
            input_token: "ETH".to_string(),
            output_token: "ZAMA".to_string(),
            input_amount: String::new(),
            output_amount: String::new(),
        }
    }
}

impl SwapForm {
    /// Submit is enabled once both amounts are filled in
    pub fn can_submit(&self) -> bool {
        !self.input_amount.trim().is_empty() && !self.output_amount.trim().is_empty()
    }

    pub fn clear_amounts(&mut self) {
        self.input_amount.clear();
        self.output_amount.clear();
    }

    pub fn to_params(&self) -> SwapParams {
        SwapParams {
            input_token: self.input_token.clone(),
            output_token: self.output_token.clone(),
            input_amount: self.input_amount.clone(),
            output_amount: self.output_amount.clone(),
        }
    }
}

/// Pool creation form bindings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPoolForm {
    pub token_pair: String,
    liquidity: String,
}

impl NewPoolForm {
    /// Set the liquidity field, keeping decimal digits only
    pub fn set_liquidity(&mut self, input: &str) {
        self.liquidity = input.chars().filter(|c| c.is_ascii_digit()).collect();
    }

    pub fn liquidity(&self) -> &str {
        &self.liquidity
    }

    pub fn can_submit(&self) -> bool {
        !self.token_pair.is_empty() && !self.liquidity.is_empty()
    }

    /// Workflow input; an unparsable (overflowing) amount becomes 0
    pub fn to_params(&self) -> CreatePoolParams {
        CreatePoolParams {
            pair_label: self.token_pair.clone(),
            liquidity: self.liquidity.parse().unwrap_or(0),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Everything a front-end renders besides the cached data
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub active_tab: Tab,
    pub swap_form: SwapForm,
    pub new_pool_form: NewPoolForm,
    pub show_create_pool_modal: bool,
    pub selected_pool: Option<PoolRecord>,
    /// Value revealed in this session for the selected, unverified pool
    pub decrypted_liquidity: Option<u64>,
    /// Initial load after connecting
    pub loading: bool,
    pub fhe_initializing: bool,
    pub contract_address: Option<String>,
}

impl ViewState {
    pub fn open_create_pool(&mut self) {
        self.show_create_pool_modal = true;
    }

    pub fn close_create_pool(&mut self) {
        self.show_create_pool_modal = false;
    }

    /// Select a pool; any previously revealed value is discarded
    pub fn select_pool(&mut self, pool: PoolRecord) {
        self.selected_pool = Some(pool);
        self.decrypted_liquidity = None;
    }

    /// Close the pool detail
    pub fn close_pool_detail(&mut self) {
        self.selected_pool = None;
        self.decrypted_liquidity = None;
    }

    /// Keep the selected pool in step with a refreshed list
    pub fn sync_selection(&mut self, pools: &[PoolRecord]) {
        if let Some(selected) = &self.selected_pool {
            if let Some(fresh) = pools.iter().find(|p| p.id == selected.id) {
                self.selected_pool = Some(fresh.clone());
            }
        }
    }

    /// Liquidity text of the pool detail
    pub fn liquidity_label(&self) -> Option<String> {
        let pool = self.selected_pool.as_ref()?;
        Some(match (pool.decrypted_value, self.decrypted_liquidity) {
            (Some(value), _) if pool.is_verified => format!("{} (Verified)", value),
            (_, Some(value)) => format!("{} (Decrypted)", value),
            _ => "FHE Encrypted".to_string(),
        })
    }

    /// Label of the verify button of the pool detail
    pub fn verify_button_label(&self, decrypting: bool) -> Option<&'static str> {
        let pool = self.selected_pool.as_ref()?;
        Some(if decrypting {
            "Verifying..."
        } else if pool.is_verified {
            "Verified"
        } else if self.decrypted_liquidity.is_some() {
            "Re-verify"
        } else {
            "Verify"
        })
    }
}

/// Shorten an address to its first 6 and last 4 characters
pub fn short_address(address: &str) -> String {
    if address.len() <= 10 || !address.is_ascii() {
        address.to_string()
    } else {
        format!("{}...{}", &address[..6], &address[address.len() - 4..])
    }
}

/// Volume with 2 decimals
pub fn format_volume(volume: u64) -> String {
    format!("{:.2}", volume as f64)
}

/// Fees with 4 decimals
pub fn format_fees(fees: u64) -> String {
    format!("{:.4}", fees as f64)
}

/// Calendar date of a unix timestamp
pub fn format_date(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(verified: bool) -> PoolRecord {
        PoolRecord {
            id: "pool-1".to_string(),
            token_pair: "ETH/ZAMA".to_string(),
            public_volume: 0,
            public_fees: 0,
            creator: "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".to_string(),
            created_at: 1_700_000_000,
            is_verified: verified,
            decrypted_value: verified.then_some(1000),
        }
    }

    #[test]
    fn test_liquidity_keeps_digits_only() {
        let mut form = NewPoolForm::default();
        form.set_liquidity("1,000.5e3");
        assert_eq!(form.liquidity(), "100053");
        assert!(!form.can_submit());

        form.token_pair = "ETH/ZAMA".to_string();
        assert!(form.can_submit());
        assert_eq!(form.to_params().liquidity, 100053);
    }

    #[test]
    fn test_swap_form_defaults_and_submit() {
        let mut form = SwapForm::default();
        assert_eq!(form.input_token, "ETH");
        assert_eq!(form.output_token, "ZAMA");
        assert!(!form.can_submit());

        form.input_amount = "1.5".to_string();
        assert!(!form.can_submit());
        form.output_amount = "600".to_string();
        assert!(form.can_submit());

        form.clear_amounts();
        assert!(form.input_amount.is_empty() && form.output_amount.is_empty());
    }

    #[test]
    fn test_selecting_pool_clears_revealed_value() {
        let mut view = ViewState::default();
        view.select_pool(pool(false));
        view.decrypted_liquidity = Some(42);
        assert_eq!(view.liquidity_label().as_deref(), Some("42 (Decrypted)"));
        assert_eq!(view.verify_button_label(false), Some("Re-verify"));

        view.select_pool(pool(false));
        assert_eq!(view.decrypted_liquidity, None);
        assert_eq!(view.liquidity_label().as_deref(), Some("FHE Encrypted"));

        view.close_pool_detail();
        assert!(view.selected_pool.is_none());
        assert!(view.liquidity_label().is_none());
    }

    #[test]
    fn test_verified_pool_labels() {
        let mut view = ViewState::default();
        view.select_pool(pool(true));
        assert_eq!(view.liquidity_label().as_deref(), Some("1000 (Verified)"));
        assert_eq!(view.verify_button_label(false), Some("Verified"));
        assert_eq!(view.verify_button_label(true), Some("Verifying..."));
    }

    #[test]
    fn test_formatting() {
        assert_eq!(
            short_address("0x70997970C51812dc3A010C7d01b50e0d17dc79C8"),
            "0x7099...79C8"
        );
        assert_eq!(short_address("0xabc"), "0xabc");
        assert_eq!(format_volume(12), "12.00");
        assert_eq!(format_fees(3), "3.0000");
        assert_eq!(format_date(0), "1970-01-01");
    }

    #[test]
    fn test_tab_cycle_and_parse() {
        assert_eq!(Tab::default(), Tab::Swap);
        assert_eq!(Tab::Stats.next(), Tab::Swap);
        assert_eq!("Pools".parse::<Tab>(), Ok(Tab::Pools));
        assert!("charts".parse::<Tab>().is_err());
    }
}
