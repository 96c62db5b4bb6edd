// Loan / EMI reconciliation for the car detail page.
//
// Two linked amounts (loan and down payment) must always sum to the selling
// price. Instead of a mutable "source of change" flag suppressing reciprocal
// updates, the state is driven by a pure reducer over tagged actions: the
// edited field is the source of truth, the counterpart is derived, and
// re-submitting a derived value is a no-op, so the classic two-way-binding
// oscillation cannot occur.

/// Slider values snap to this interval, both while dragging and when typed.
pub const ROUND_STEP: u64 = 2000;
pub const DEFAULT_DURATION_MONTHS: u32 = 60;
pub const DEFAULT_ANNUAL_RATE_PERCENT: f64 = 9.5;
pub const MIN_DURATION_MONTHS: u32 = 12;
pub const MAX_DURATION_MONTHS: u32 = 84;
pub const MAX_ANNUAL_RATE_PERCENT: f64 = 30.0;

/// Rounds to the nearest step so pointer-drag jitter never surfaces.
pub fn round_to_step(value: u64) -> u64 {
    (value + ROUND_STEP / 2) / ROUND_STEP * ROUND_STEP
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoanState {
    pub selling_price: u64,
    pub loan_amount: u64,
    pub down_payment: u64,
    pub duration_months: u32,
    pub annual_rate_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoanAction {
    SetLoanAmount(u64),
    SetDownPayment(u64),
    SetDurationMonths(u32),
    SetAnnualRate(f64),
    /// A different car was loaded; everything resets around its price.
    ResetForPrice(u64),
}

impl LoanState {
    /// Defaults for a freshly loaded car: down payment at 20% of the price
    /// (step-rounded, capped at the price), loan covering the remainder.
    pub fn for_price(selling_price: u64) -> Self {
        let down_payment =
            round_to_step((selling_price as f64 * 0.20) as u64).min(selling_price);
        LoanState {
            selling_price,
            loan_amount: selling_price - down_payment,
            down_payment,
            duration_months: DEFAULT_DURATION_MONTHS,
            annual_rate_percent: DEFAULT_ANNUAL_RATE_PERCENT,
        }
    }

    /// Pure state transition. `loan_amount + down_payment == selling_price`
    /// holds on entry and on exit of every action.
    pub fn reduce(self, action: LoanAction) -> Self {
        match action {
            LoanAction::SetLoanAmount(value) => {
                if value == self.loan_amount {
                    return self;
                }
                let loan_amount = round_to_step(value).min(self.selling_price);
                LoanState {
                    loan_amount,
                    down_payment: self.selling_price - loan_amount,
                    ..self
                }
            }
            LoanAction::SetDownPayment(value) => {
                if value == self.down_payment {
                    return self;
                }
                let down_payment = round_to_step(value).min(self.selling_price);
                LoanState {
                    down_payment,
                    loan_amount: self.selling_price - down_payment,
                    ..self
                }
            }
            LoanAction::SetDurationMonths(value) => LoanState {
                duration_months: value.clamp(MIN_DURATION_MONTHS, MAX_DURATION_MONTHS),
                ..self
            },
            LoanAction::SetAnnualRate(value) => LoanState {
                annual_rate_percent: value.clamp(0.0, MAX_ANNUAL_RATE_PERCENT),
                ..self
            },
            LoanAction::ResetForPrice(price) => LoanState::for_price(price),
        }
    }

    /// Monthly installment under standard reducing-balance amortization:
    /// `P * r * (1+r)^n / ((1+r)^n - 1)` with `r` the monthly rate.
    /// Zero principal or zero duration reports 0 instead of dividing by it.
    pub fn emi(&self) -> f64 {
        let principal = self.loan_amount as f64;
        let months = self.duration_months as f64;
        if principal == 0.0 || months == 0.0 {
            return 0.0;
        }
        let monthly_rate = self.annual_rate_percent / 1200.0;
        if monthly_rate == 0.0 {
            return principal / months;
        }
        let factor = (1.0 + monthly_rate).powf(months);
        principal * monthly_rate * factor / (factor - 1.0)
    }

    /// Total interest paid over the full term.
    pub fn total_interest(&self) -> f64 {
        (self.emi() * self.duration_months as f64 - self.loan_amount as f64).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_put_twenty_percent_down() {
        let state = LoanState::for_price(1_000_000);
        assert_eq!(state.down_payment, 200_000);
        assert_eq!(state.loan_amount, 800_000);
        assert_eq!(state.loan_amount + state.down_payment, state.selling_price);
        assert_eq!(state.duration_months, DEFAULT_DURATION_MONTHS);
    }

    #[test]
    fn editing_loan_derives_down_payment() {
        let state = LoanState::for_price(1_000_000).reduce(LoanAction::SetLoanAmount(650_500));
        // Rounded to the nearest 2000
        assert_eq!(state.loan_amount, 650_000);
        assert_eq!(state.down_payment, 350_000);
    }

    #[test]
    fn resubmitting_the_derived_value_does_not_oscillate() {
        let price = 1_001_000; // deliberately not a multiple of the step
        let state = LoanState::for_price(price).reduce(LoanAction::SetLoanAmount(633_333));
        let derived_down = state.down_payment;
        assert_eq!(state.loan_amount + derived_down, price);

        // The paired input echoes the derived value straight back
        let echoed = state.reduce(LoanAction::SetDownPayment(derived_down));
        assert_eq!(echoed, state);
    }

    #[test]
    fn amounts_clamp_to_the_selling_price() {
        let state = LoanState::for_price(500_000).reduce(LoanAction::SetLoanAmount(2_000_000));
        assert_eq!(state.loan_amount, 500_000);
        assert_eq!(state.down_payment, 0);

        let state = state.reduce(LoanAction::SetDownPayment(9_999_999));
        assert_eq!(state.down_payment, 500_000);
        assert_eq!(state.loan_amount, 0);
    }

    #[test]
    fn price_change_resets_everything() {
        let state = LoanState::for_price(1_000_000)
            .reduce(LoanAction::SetLoanAmount(100_000))
            .reduce(LoanAction::SetAnnualRate(14.0))
            .reduce(LoanAction::ResetForPrice(600_000));
        assert_eq!(state, LoanState::for_price(600_000));
        assert_eq!(state.annual_rate_percent, DEFAULT_ANNUAL_RATE_PERCENT);
    }

    #[test]
    fn emi_matches_the_reducing_balance_formula() {
        let state = LoanState {
            selling_price: 100_000,
            loan_amount: 100_000,
            down_payment: 0,
            duration_months: 12,
            annual_rate_percent: 12.0,
        };
        // 1 lakh over 12 months at 12% p.a. -> 8884.88/month
        assert!((state.emi() - 8884.8788).abs() < 0.01);
    }

    #[test]
    fn emi_guards_against_zero_principal_and_duration() {
        let mut state = LoanState::for_price(500_000);
        state.loan_amount = 0;
        assert_eq!(state.emi(), 0.0);

        let mut state = LoanState::for_price(500_000);
        state.duration_months = 0;
        assert_eq!(state.emi(), 0.0);
    }

    #[test]
    fn zero_rate_degrades_to_straight_division() {
        let state = LoanState {
            selling_price: 120_000,
            loan_amount: 120_000,
            down_payment: 0,
            duration_months: 12,
            annual_rate_percent: 0.0,
        };
        assert_eq!(state.emi(), 10_000.0);
    }
}
