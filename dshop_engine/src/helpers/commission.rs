use dshop_common::MinorUnits;

/// Referrers earn 0.5% of the order sub-total.
pub const COMMISSION_DIVISOR: i64 = 200;

/// The commission owed to a referrer, rounded down to the nearest minor unit.
pub fn referral_commission(sub_total: MinorUnits) -> MinorUnits {
    sub_total.div_floor(COMMISSION_DIVISOR)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn commission_rounds_down() {
        assert_eq!(referral_commission(MinorUnits::from(10050)), MinorUnits::from(50));
        assert_eq!(referral_commission(MinorUnits::from(199)), MinorUnits::from(0));
        assert_eq!(referral_commission(MinorUnits::from(400)), MinorUnits::from(2));
        assert_eq!(referral_commission(MinorUnits::from(0)), MinorUnits::from(0));
    }
}
