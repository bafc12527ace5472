use crate::pipeline::{Envelope, TariffError, Transform};
use tariff_domain::Reading;
/// Pure validation of a parsed `Reading`.
///
/// Rules:
/// - kWh must be finite and non-negative.
pub fn validate_reading(env: Envelope<Reading>) -> Result<Envelope<Reading>, TariffError> {
    let r = &env.payload;

    if !r.kwh.is_finite() || r.kwh < 0.0 {
        return Err(TariffError::Coercion {
            row: env.row,
            message: format!("kwh must be a non-negative number, got {}", r.kwh),
        });
    }

    Ok(env)
}

#[derive(Clone, Default)]
pub struct ReadingValidation;

#[async_trait::async_trait]
impl Transform<Reading, Reading> for ReadingValidation {
    async fn apply(&self, input: Envelope<Reading>) -> Result<Envelope<Reading>, TariffError> {
        match validate_reading(input) {
            Ok(env) => Ok(env),
            Err(e) => {
                metrics::counter!("validation_reading_rejected_total").increment(1);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn reading_validation_accepts_valid_record() {
        let env = Envelope::new(Reading::new(date!(2024 - 01 - 01), 1.0), 1);
        assert!(validate_reading(env).is_ok());
    }

    #[test]
    fn reading_validation_accepts_zero_kwh() {
        let env = Envelope::new(Reading::new(date!(2024 - 01 - 01), 0.0), 1);
        assert!(validate_reading(env).is_ok());
    }

    #[test]
    fn reading_validation_rejects_negative_kwh() {
        let env = Envelope::new(Reading::new(date!(2024 - 01 - 01), -0.1), 4);
        let res = validate_reading(env);
        assert!(matches!(res, Err(TariffError::Coercion { row: 4, .. })));
    }

    #[test]
    fn reading_validation_rejects_nan_kwh() {
        let env = Envelope::new(Reading::new(date!(2024 - 01 - 01), f64::NAN), 2);
        let res = validate_reading(env);
        assert!(matches!(res, Err(TariffError::Coercion { .. })));
    }

    #[test]
    fn reading_validation_accepts_any_real_calendar_date() {
        for d in [date!(1999 - 06 - 15), date!(2100 - 01 - 31)] {
            let env = Envelope::new(Reading::new(d, 1.0), 1);
            assert!(validate_reading(env).is_ok());
        }
    }
}
