use crate::errors::GeneratorError;
use crate::record::Record;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, LogNormal};

/// Symbols cycled through by generated books.
const SYMBOLS: [&str; 4] = ["MSFT", "AAPL", "AMZN", "META"];

/// Starting price for every symbol in a generated book.
const START_PRICE: f64 = 100.0;

/// Random record book generator for the exchange simulator.
///
/// Each symbol's price follows its own log-normal walk; quantities and
/// sides are uniform random.
#[derive(Debug)]
pub struct RecordGenerator {
    /// Standard deviation of the log-normal price multiplier.
    volatility: f64,
}

impl RecordGenerator {
    /// Creates a new generator.
    ///
    /// # Errors
    /// Returns [`GeneratorError::InvalidVolatility`] if `volatility <= 0.0` or `> 1.0`.
    pub fn new(volatility: f64) -> Result<Self, GeneratorError> {
        if volatility <= 0.0 || volatility > 1.0 {
            return Err(GeneratorError::InvalidVolatility(volatility));
        }
        Ok(Self { volatility })
    }

    /// Generates `count` records with sequences `1..=count`.
    pub fn generate(&self, count: usize) -> Result<Vec<Record>, GeneratorError> {
        self.generate_with(&mut StdRng::from_entropy(), count)
    }

    /// Same as [`generate`](Self::generate) with a caller-provided RNG.
    pub fn generate_with<R: Rng>(
        &self,
        rng: &mut R,
        count: usize,
    ) -> Result<Vec<Record>, GeneratorError> {
        let log_normal = LogNormal::new(0.0, self.volatility)?;
        let mut prices = [START_PRICE; SYMBOLS.len()];
        let mut records = Vec::with_capacity(count);

        for i in 0..count {
            let slot = i % SYMBOLS.len();
            prices[slot] *= log_normal.sample(&mut *rng);
            let side = if rng.gen_bool(0.5) { b'B' } else { b'S' };
            records.push(Record::new(
                SYMBOLS[slot],
                side,
                rng.gen_range(1..=100),
                prices[slot].round() as i32,
                i as i32 + 1,
            ));
        }

        Ok(records)
    }
}
