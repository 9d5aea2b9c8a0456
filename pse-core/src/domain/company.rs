//! Company: one listed entity in the exchange directory.

use serde::{Deserialize, Serialize};

/// A listed company as scraped from the directory.
///
/// `(company_id, security_id)` addresses the history endpoint; `stock_symbol`
/// is the human-facing key used for filenames and symbol filtering.
/// Field names serialize to the companies list CSV header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Company {
    #[serde(rename = "companyId")]
    pub company_id: String,
    #[serde(rename = "securityId")]
    pub security_id: String,
    #[serde(rename = "companyName")]
    pub company_name: String,
    #[serde(rename = "stockSymbol")]
    pub stock_symbol: String,
}

impl Company {
    pub fn new(
        company_id: impl Into<String>,
        security_id: impl Into<String>,
        company_name: impl Into<String>,
        stock_symbol: impl Into<String>,
    ) -> Self {
        Self {
            company_id: company_id.into(),
            security_id: security_id.into(),
            company_name: company_name.into(),
            stock_symbol: stock_symbol.into(),
        }
    }

    /// Upper-cased symbol, the form symbol allow-lists are compared in.
    pub fn symbol_key(&self) -> String {
        self.stock_symbol.trim().to_uppercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_key_is_upper_cased() {
        let c = Company::new("1", "2", "Banco de Oro", " bdo");
        assert_eq!(c.symbol_key(), "BDO");
    }
}
