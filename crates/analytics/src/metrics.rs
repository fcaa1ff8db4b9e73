use core_types::FinancialRecord;
use serde::{Deserialize, Serialize};

/// A financial-health view over one `FinancialRecord`.
///
/// All ratios are derived on demand and never stored; the struct is a thin
/// wrapper constructed from a record and discarded after serialization or
/// display. Every division is guarded per-function: a non-positive
/// denominator yields `0.0`, never an error or NaN. Downstream display code
/// relies on that sentinel, so the guard must stay on the exact quantity the
/// formula divides by (revenue, current liabilities, equity, total assets),
/// not on some blanket "all fields positive" check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialMetrics {
    pub record: FinancialRecord,
}

impl FinancialMetrics {
    pub fn new(record: FinancialRecord) -> Self {
        Self { record }
    }

    // --- Profitability ---

    /// Gross Profit = Revenue - COGS.
    pub fn gross_profit(&self) -> f64 {
        self.record.revenue - self.record.cogs
    }

    /// Gross Margin = Gross Profit / Revenue.
    pub fn gross_margin(&self) -> f64 {
        if self.record.revenue > 0.0 {
            self.gross_profit() / self.record.revenue
        } else {
            0.0
        }
    }

    /// EBITDA = Revenue - COGS - Operating Expenses + Depreciation + Amortization.
    ///
    /// Approximates operating cash flow by excluding non-cash expenses and
    /// financing/tax effects.
    pub fn ebitda(&self) -> f64 {
        self.record.revenue - self.record.cogs - self.record.operating_expenses
            + self.record.depreciation
            + self.record.amortization
    }

    /// EBIT = EBITDA - Depreciation - Amortization (operating income).
    ///
    /// Defined in terms of `ebitda()` rather than as an independent formula
    /// so the two can never drift apart.
    pub fn ebit(&self) -> f64 {
        self.ebitda() - self.record.depreciation - self.record.amortization
    }

    /// Net Income = EBIT - Interest - Taxes.
    pub fn net_income(&self) -> f64 {
        self.ebit() - self.record.interest - self.record.taxes
    }

    /// Net Margin = Net Income / Revenue.
    pub fn net_margin(&self) -> f64 {
        if self.record.revenue > 0.0 {
            self.net_income() / self.record.revenue
        } else {
            0.0
        }
    }

    /// Operating Margin = EBIT / Revenue.
    pub fn operating_margin(&self) -> f64 {
        if self.record.revenue > 0.0 {
            self.ebit() / self.record.revenue
        } else {
            0.0
        }
    }

    // --- Liquidity ---

    /// Working Capital = Current Assets - Current Liabilities.
    pub fn working_capital(&self) -> f64 {
        self.record.current_assets - self.record.current_liabilities
    }

    /// Current Ratio = Current Assets / Current Liabilities.
    pub fn current_ratio(&self) -> f64 {
        if self.record.current_liabilities > 0.0 {
            self.record.current_assets / self.record.current_liabilities
        } else {
            0.0
        }
    }

    /// Quick Ratio (acid test) = (Current Assets - Inventory) / Current Liabilities.
    pub fn quick_ratio(&self) -> f64 {
        if self.record.current_liabilities > 0.0 {
            (self.record.current_assets - self.record.inventory)
                / self.record.current_liabilities
        } else {
            0.0
        }
    }

    // --- Leverage ---

    /// Equity = Total Assets - Total Liabilities (book value).
    pub fn equity(&self) -> f64 {
        self.record.total_assets - self.record.total_liabilities
    }

    /// Debt-to-Equity = Total Liabilities / Equity.
    pub fn debt_to_equity(&self) -> f64 {
        if self.equity() > 0.0 {
            self.record.total_liabilities / self.equity()
        } else {
            0.0
        }
    }

    /// Debt Ratio = Total Liabilities / Total Assets.
    pub fn debt_ratio(&self) -> f64 {
        if self.record.total_assets > 0.0 {
            self.record.total_liabilities / self.record.total_assets
        } else {
            0.0
        }
    }

    // --- Returns ---

    /// Return on Assets = Net Income / Total Assets.
    pub fn return_on_assets(&self) -> f64 {
        if self.record.total_assets > 0.0 {
            self.net_income() / self.record.total_assets
        } else {
            0.0
        }
    }

    /// Return on Equity = Net Income / Equity.
    pub fn return_on_equity(&self) -> f64 {
        if self.equity() > 0.0 {
            self.net_income() / self.equity()
        } else {
            0.0
        }
    }
}

impl From<FinancialRecord> for FinancialMetrics {
    fn from(record: FinancialRecord) -> Self {
        Self::new(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> FinancialRecord {
        FinancialRecord {
            period: "2025-Q1".to_string(),
            company_id: "ACME".to_string(),
            revenue: 1000.0,
            cogs: 400.0,
            operating_expenses: 250.0,
            depreciation: 50.0,
            amortization: 25.0,
            interest: 30.0,
            taxes: 45.0,
            current_assets: 600.0,
            current_liabilities: 300.0,
            inventory: 100.0,
            total_assets: 2000.0,
            total_liabilities: 1200.0,
        }
    }

    #[test]
    fn profitability_chain() {
        let m = FinancialMetrics::new(sample_record());
        assert_eq!(m.gross_profit(), 600.0);
        assert_eq!(m.gross_margin(), 0.6);
        assert_eq!(m.ebitda(), 425.0);
        assert_eq!(m.ebit(), 350.0);
        assert_eq!(m.net_income(), 275.0);
        assert_eq!(m.net_margin(), 0.275);
        assert_eq!(m.operating_margin(), 0.35);
    }

    #[test]
    fn ebit_is_ebitda_minus_non_cash() {
        // ebit() must be derived from ebitda(), not recomputed.
        let m = FinancialMetrics::new(sample_record());
        assert_eq!(
            m.ebit(),
            m.ebitda() - m.record.depreciation - m.record.amortization
        );
    }

    #[test]
    fn liquidity_and_leverage() {
        let m = FinancialMetrics::new(sample_record());
        assert_eq!(m.working_capital(), 300.0);
        assert_eq!(m.current_ratio(), 2.0);
        assert!((m.quick_ratio() - 500.0 / 300.0).abs() < 1e-12);
        assert_eq!(m.equity(), 800.0);
        assert_eq!(m.debt_to_equity(), 1.5);
        assert_eq!(m.debt_ratio(), 0.6);
    }

    #[test]
    fn zero_revenue_margins_are_zero() {
        let mut rec = sample_record();
        rec.revenue = 0.0;
        let m = FinancialMetrics::new(rec);
        assert_eq!(m.gross_margin(), 0.0);
        assert_eq!(m.net_margin(), 0.0);
        assert_eq!(m.operating_margin(), 0.0);
    }

    #[test]
    fn zero_equity_ratios_are_zero() {
        // total_assets == total_liabilities makes equity exactly zero.
        let mut rec = sample_record();
        rec.total_assets = 0.0;
        rec.total_liabilities = 0.0;
        let m = FinancialMetrics::new(rec);
        assert_eq!(m.equity(), 0.0);
        assert_eq!(m.debt_to_equity(), 0.0);
        assert_eq!(m.return_on_equity(), 0.0);
        assert_eq!(m.debt_ratio(), 0.0);
        assert_eq!(m.return_on_assets(), 0.0);
    }

    #[test]
    fn negative_denominators_hit_the_sentinel() {
        // The guards test `> 0`, so negative inputs take the same path.
        let mut rec = sample_record();
        rec.current_liabilities = -10.0;
        rec.total_liabilities = rec.total_assets + 500.0; // negative equity
        let m = FinancialMetrics::new(rec);
        assert_eq!(m.current_ratio(), 0.0);
        assert_eq!(m.quick_ratio(), 0.0);
        assert_eq!(m.debt_to_equity(), 0.0);
        assert_eq!(m.return_on_equity(), 0.0);
    }
}
