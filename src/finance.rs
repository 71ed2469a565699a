//! General functions related to finance.
//!
//! These present-value factors are used to convert annual costs and revenues into lifecycle
//! values when building optimisation model coefficients.
use crate::units::{Dimensionless, Money};

/// Round `value` to the given number of decimal places
fn round_to(value: f64, digits: i32) -> f64 {
    let scale = 10_f64.powi(digits);
    (value * scale).round() / scale
}

/// Present worth factor of a geometric series with ratio `x`, starting at `x` (rounded to five
/// decimal places)
fn geometric_present_worth(years: u32, x: Dimensionless) -> Dimensionless {
    if x == Dimensionless(1.0) {
        return Dimensionless(years as f64);
    }

    let pwf = x.value() * (1.0 - x.value().powi(years as i32)) / (1.0 - x.value());
    Dimensionless(round_to(pwf, 5))
}

/// Calculates the present worth factor of a cash flow which escalates each year.
///
/// Escalation begins in year 1, i.e. the cash flow in year `n` is `(1 + escalation)^n`.
pub fn annuity(years: u32, escalation: Dimensionless, discount: Dimensionless) -> Dimensionless {
    let x = (Dimensionless(1.0) + escalation) / (Dimensionless(1.0) + discount);
    geometric_present_worth(years, x)
}

/// As [`annuity`], but with two compounding escalation rates
pub fn annuity_two_rates(
    years: u32,
    escalation1: Dimensionless,
    escalation2: Dimensionless,
    discount: Dimensionless,
) -> Dimensionless {
    let x = (Dimensionless(1.0) + escalation1 + escalation2 + escalation1 * escalation2)
        / (Dimensionless(1.0) + discount);
    geometric_present_worth(years, x)
}

/// Calculates the present worth factor of a cash flow which starts escalating in year 2.
///
/// Sums `(1 + escalation)^(n - 1) / (1 + discount)^n` for `n` in `1..=years + 1`.
pub fn annuity_escalation(
    years: u32,
    escalation: Dimensionless,
    discount: Dimensionless,
) -> Dimensionless {
    (1..=years as i32 + 1)
        .map(|n| {
            (Dimensionless(1.0) + escalation).powi(n - 1) / (Dimensionless(1.0) + discount).powi(n)
        })
        .sum()
}

/// Calculates the levelization factor for a producing technology which degrades over time.
///
/// This is the ratio of the present worth of an escalating production stream which degrades from
/// year 2 onwards to that of an undegraded stream ([`annuity`]). Multiplying production by this
/// factor means the value of production can be discounted with the undegraded annuity.
pub fn levelization_factor(
    years: u32,
    escalation: Dimensionless,
    discount: Dimensionless,
    degradation: Dimensionless,
) -> Dimensionless {
    let reference = annuity(years, escalation, discount);
    if reference == Dimensionless(0.0) {
        // No production years
        return Dimensionless(1.0);
    }

    let x = (Dimensionless(1.0) + escalation) / (Dimensionless(1.0) + discount);
    let degraded: Dimensionless = (1..=years as i32)
        .map(|n| x.powi(n) * (Dimensionless(1.0) - degradation).powi(n - 1))
        .sum();

    degraded / reference
}

/// Net present value of a series of annual cash flows.
///
/// The first cash flow occurs now and is not discounted.
pub fn npv(rate: Dimensionless, cash_flows: &[Money]) -> Money {
    let one_plus_rate = Dimensionless(1.0) + rate;
    cash_flows
        .iter()
        .zip(0_i32..)
        .map(|(cash_flow, year)| *cash_flow / one_plus_rate.powi(year))
        .sum()
}

/// Tax and incentive parameters for [`effective_cost`]
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveCostInputs<'a> {
    /// Capital cost on which the investment tax credit is calculated
    pub itc_basis: Money,
    /// Cost of replacing the asset
    pub replacement_cost: Money,
    /// Year in which the asset is replaced
    pub replacement_year: u32,
    /// Owner's discount rate
    pub discount_rate: Dimensionless,
    /// Owner's tax rate
    pub tax_rate: Dimensionless,
    /// Investment tax credit as a fraction of `itc_basis`
    pub itc_fraction: Dimensionless,
    /// MACRS depreciation schedule
    pub macrs_schedule: &'a [Dimensionless],
    /// Fraction of the depreciable basis taken as bonus depreciation in year 1
    pub macrs_bonus_fraction: Dimensionless,
    /// Fraction of the ITC by which the depreciable basis is reduced
    pub macrs_itc_reduction: Dimensionless,
    /// Rebate per unit of capacity
    pub rebate_per_unit: Money,
}

/// Calculates the capital cost of an asset after tax incentives, including the present value of
/// its replacement.
///
/// The ITC and bonus depreciation reduce the depreciable basis, which is then depreciated
/// according to the MACRS schedule. The result is rounded to four decimal places and is never
/// negative.
pub fn effective_cost(inputs: &EffectiveCostInputs) -> Money {
    let one = Dimensionless(1.0);

    let mut depreciable_basis =
        inputs.itc_basis * (one - inputs.macrs_itc_reduction * inputs.itc_fraction);
    let bonus_depreciation = depreciable_basis * inputs.macrs_bonus_fraction;
    depreciable_basis = depreciable_basis - bonus_depreciation;

    // Replacement cost is tax deductible
    let replacement = inputs.replacement_cost * (one - inputs.tax_rate)
        / (one + inputs.discount_rate).powi(inputs.replacement_year as i32);

    // Year 0 has no tax savings; bonus depreciation and the ITC are realised in year 1
    let years = inputs.macrs_schedule.len().max(1);
    let mut tax_savings = vec![Money(0.0); years + 1];
    for (year, savings) in tax_savings.iter_mut().enumerate().skip(1) {
        let fraction = inputs
            .macrs_schedule
            .get(year - 1)
            .copied()
            .unwrap_or_default();
        let mut depreciation = depreciable_basis * fraction;
        if year == 1 {
            depreciation += bonus_depreciation;
        }
        *savings = depreciation * inputs.tax_rate;
    }
    tax_savings[1] += inputs.itc_basis * inputs.itc_fraction;

    let cost = inputs.itc_basis - npv(inputs.discount_rate, &tax_savings) + replacement
        - inputs.rebate_per_unit;

    Money(round_to(cost.value(), 4).max(0.0))
}

/// Present value of the tax savings from straight-line depreciation of `capital_cost` over
/// `years`, realised from the end of year 1
pub fn straight_line_depreciation_savings(
    capital_cost: Money,
    discount: Dimensionless,
    years: u32,
    tax_rate: Dimensionless,
) -> Money {
    if years == 0 {
        return Money(0.0);
    }

    let annual_savings = capital_cost / Dimensionless(years as f64) * tax_rate;
    let cash_flows: Vec<_> = std::iter::once(Money(0.0))
        .chain(std::iter::repeat_n(annual_savings, years as usize))
        .collect();

    npv(discount, &cash_flows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use itertools::iproduct;
    use rstest::{fixture, rstest};

    fn rates(values: &[f64]) -> Vec<Dimensionless> {
        values.iter().copied().map(Dimensionless).collect()
    }

    #[fixture]
    fn macrs_five_year() -> Vec<Dimensionless> {
        rates(&[0.2, 0.32, 0.192, 0.1152, 0.1152, 0.0576])
    }

    #[rstest]
    #[case(25, 0.025, 0.0638, 15.98261)]
    #[case(20, 0.0, 0.05, 12.46221)]
    #[case(10, 0.05, 0.05, 10.0)] // Escalation equals discount rate
    #[case(0, 0.02, 0.05, 0.0)]
    fn test_annuity(
        #[case] years: u32,
        #[case] escalation: f64,
        #[case] discount: f64,
        #[case] expected: f64,
    ) {
        let result = annuity(years, Dimensionless(escalation), Dimensionless(discount));
        assert_approx_eq!(Dimensionless, result, Dimensionless(expected), epsilon = 1e-10);
    }

    #[test]
    fn test_annuity_equal_rates_is_years() {
        for (years, rate) in iproduct!([1, 7, 25, 40], [0.0, 0.03, 0.0638, 0.2]) {
            let rate = Dimensionless(rate);
            assert_eq!(annuity(years, rate, rate), Dimensionless(years as f64));
        }
    }

    #[rstest]
    #[case(25, 0.017, 0.01, 0.0638, 16.36389)]
    #[case(15, 0.0, 0.0, 0.0, 15.0)]
    fn test_annuity_two_rates(
        #[case] years: u32,
        #[case] escalation1: f64,
        #[case] escalation2: f64,
        #[case] discount: f64,
        #[case] expected: f64,
    ) {
        let result = annuity_two_rates(
            years,
            Dimensionless(escalation1),
            Dimensionless(escalation2),
            Dimensionless(discount),
        );
        assert_approx_eq!(Dimensionless, result, Dimensionless(expected), epsilon = 1e-10);
    }

    #[test]
    fn test_annuity_two_rates_matches_annuity() {
        // A second rate of zero gives the single-rate annuity
        assert_eq!(
            annuity_two_rates(
                25,
                Dimensionless(0.02),
                Dimensionless(0.0),
                Dimensionless(0.07)
            ),
            annuity(25, Dimensionless(0.02), Dimensionless(0.07))
        );
    }

    #[rstest]
    #[case(25, 0.017, 0.0638, 14.734_074_004_582_02)]
    #[case(1, 0.1, 0.1, 1.818_181_818_181_818)]
    fn test_annuity_escalation(
        #[case] years: u32,
        #[case] escalation: f64,
        #[case] discount: f64,
        #[case] expected: f64,
    ) {
        let result = annuity_escalation(years, Dimensionless(escalation), Dimensionless(discount));
        assert_approx_eq!(Dimensionless, result, Dimensionless(expected), epsilon = 1e-10);
    }

    #[rstest]
    #[case(25, 0.017, 0.0638, 0.005, 0.953_083_055_480_971_7)]
    #[case(20, 0.02, 0.06, 0.0, 1.000_000_127_127_258_5)]
    fn test_levelization_factor(
        #[case] years: u32,
        #[case] escalation: f64,
        #[case] discount: f64,
        #[case] degradation: f64,
        #[case] expected: f64,
    ) {
        let result = levelization_factor(
            years,
            Dimensionless(escalation),
            Dimensionless(discount),
            Dimensionless(degradation),
        );
        assert_approx_eq!(Dimensionless, result, Dimensionless(expected), epsilon = 1e-10);
    }

    #[test]
    fn test_levelization_factor_no_degradation_is_one() {
        for (years, escalation, discount) in
            iproduct!([1, 10, 25], [0.0, 0.017, 0.05], [0.03, 0.0638, 0.1])
        {
            let result = levelization_factor(
                years,
                Dimensionless(escalation),
                Dimensionless(discount),
                Dimensionless(0.0),
            );
            assert_approx_eq!(Dimensionless, result, Dimensionless(1.0), epsilon = 1e-5);
        }
    }

    #[test]
    fn test_levelization_factor_zero_years() {
        assert_eq!(
            levelization_factor(
                0,
                Dimensionless(0.02),
                Dimensionless(0.05),
                Dimensionless(0.01)
            ),
            Dimensionless(1.0)
        );
    }

    #[rstest]
    #[case(0.1, &[-100.0, 50.0, 60.0], -4.958_677_685_950_42)]
    #[case(0.05, &[10.0], 10.0)]
    #[case(0.05, &[], 0.0)]
    fn test_npv(#[case] rate: f64, #[case] cash_flows: &[f64], #[case] expected: f64) {
        let cash_flows: Vec<_> = cash_flows.iter().copied().map(Money).collect();
        let result = npv(Dimensionless(rate), &cash_flows);
        assert_approx_eq!(Money, result, Money(expected), epsilon = 1e-10);
    }

    #[test]
    fn test_npv_only_initial_flow() {
        for rate in [-0.5, 0.0, 0.0638, 3.0] {
            let result = npv(
                Dimensionless(rate),
                &[Money(123.0), Money(0.0), Money(0.0), Money(0.0)],
            );
            assert_eq!(result, Money(123.0));
        }
    }

    #[rstest]
    #[case(1000.0, 0.0, 0.3, 1.0, 0.0, 510.2463)] // Full bonus depreciation
    #[case(1000.0, 0.0, 0.3, 0.0, 0.0, 531.355)]
    #[case(100.0, 0.0, 0.3, 0.0, 500.0, 0.0)] // Rebate exceeds cost
    fn test_effective_cost(
        macrs_five_year: Vec<Dimensionless>,
        #[case] itc_basis: f64,
        #[case] replacement_cost: f64,
        #[case] itc_fraction: f64,
        #[case] macrs_bonus_fraction: f64,
        #[case] rebate_per_unit: f64,
        #[case] expected: f64,
    ) {
        let inputs = EffectiveCostInputs {
            itc_basis: Money(itc_basis),
            replacement_cost: Money(replacement_cost),
            replacement_year: 10,
            discount_rate: Dimensionless(0.0638),
            tax_rate: Dimensionless(0.26),
            itc_fraction: Dimensionless(itc_fraction),
            macrs_schedule: &macrs_five_year,
            macrs_bonus_fraction: Dimensionless(macrs_bonus_fraction),
            macrs_itc_reduction: Dimensionless(0.5),
            rebate_per_unit: Money(rebate_per_unit),
        };
        assert_approx_eq!(
            Money,
            effective_cost(&inputs),
            Money(expected),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_effective_cost_with_replacement() {
        let macrs_seven_year = rates(&[
            0.1429, 0.2449, 0.1749, 0.1249, 0.0893, 0.0892, 0.0893, 0.0446,
        ]);
        let inputs = EffectiveCostInputs {
            itc_basis: Money(1000.0),
            replacement_cost: Money(200.0),
            replacement_year: 10,
            discount_rate: Dimensionless(0.0638),
            tax_rate: Dimensionless(0.26),
            itc_fraction: Dimensionless(0.0),
            macrs_schedule: &macrs_seven_year,
            macrs_bonus_fraction: Dimensionless(0.0),
            macrs_itc_reduction: Dimensionless(0.5),
            rebate_per_unit: Money(50.0),
        };
        assert_approx_eq!(
            Money,
            effective_cost(&inputs),
            Money(820.2423),
            epsilon = 1e-9
        );
    }

    #[rstest]
    fn test_effective_cost_non_increasing_in_itc(macrs_five_year: Vec<Dimensionless>) {
        for (bonus, reduction, tax) in iproduct!([0.0, 0.6, 1.0], [0.0, 0.5, 1.0], [0.0, 0.26, 0.4])
        {
            let mut previous = Money(f64::INFINITY);
            for itc in [0.0, 0.1, 0.26, 0.3, 0.5, 1.0] {
                let cost = effective_cost(&EffectiveCostInputs {
                    itc_basis: Money(2500.0),
                    replacement_cost: Money(300.0),
                    replacement_year: 12,
                    discount_rate: Dimensionless(0.08),
                    tax_rate: Dimensionless(tax),
                    itc_fraction: Dimensionless(itc),
                    macrs_schedule: &macrs_five_year,
                    macrs_bonus_fraction: Dimensionless(bonus),
                    macrs_itc_reduction: Dimensionless(reduction),
                    rebate_per_unit: Money(0.0),
                });
                assert!(cost >= Money(0.0));
                assert!(cost <= previous);
                previous = cost;
            }
        }
    }

    #[test]
    fn test_effective_cost_empty_schedule() {
        // Bonus depreciation and the ITC are still realised in year 1
        let inputs = EffectiveCostInputs {
            itc_basis: Money(1000.0),
            replacement_cost: Money(0.0),
            replacement_year: 0,
            discount_rate: Dimensionless(0.0),
            tax_rate: Dimensionless(0.2),
            itc_fraction: Dimensionless(0.1),
            macrs_schedule: &[],
            macrs_bonus_fraction: Dimensionless(1.0),
            macrs_itc_reduction: Dimensionless(0.0),
            rebate_per_unit: Money(0.0),
        };
        // 1000 - (1000 * 0.2 + 1000 * 0.1)
        assert_approx_eq!(Money, effective_cost(&inputs), Money(700.0), epsilon = 1e-9);
    }

    #[rstest]
    #[case(1000.0, 0.0638, 10, 0.26, 187.963_719_617_275_47)]
    #[case(1000.0, 0.0, 4, 0.25, 250.0)]
    #[case(1000.0, 0.05, 0, 0.25, 0.0)]
    fn test_straight_line_depreciation_savings(
        #[case] capital_cost: f64,
        #[case] discount: f64,
        #[case] years: u32,
        #[case] tax_rate: f64,
        #[case] expected: f64,
    ) {
        let result = straight_line_depreciation_savings(
            Money(capital_cost),
            Dimensionless(discount),
            years,
            Dimensionless(tax_rate),
        );
        assert_approx_eq!(Money, result, Money(expected), epsilon = 1e-9);
    }
}
