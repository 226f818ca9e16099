use std::borrow::Cow;
use std::fmt;

/// A single market-data record as delivered by the exchange.
///
/// Every field maps one-to-one onto the fixed 17-byte wire frame
/// (see [`codec`](crate::codec)). The client never validates field values:
/// whatever the server sends is preserved as-is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Record {
    /// Four-byte instrument symbol (e.g. `b"MSFT"`), not null-terminated.
    pub symbol: [u8; 4],

    /// Buy/sell indicator byte. Conventionally `b'B'` or `b'S'`, but opaque.
    pub side: u8,

    /// Order quantity.
    pub quantity: i32,

    /// Order price.
    pub price: i32,

    /// Server-assigned sequence number.
    ///
    /// Used for ordering, deduplication and gap detection.
    pub sequence: i32,
}

impl Record {
    /// Creates a record from a textual symbol.
    ///
    /// The symbol is truncated or right-padded with spaces to four bytes.
    ///
    /// # Example
    ///
    /// ```
    /// use abx_client::record::Record;
    /// let r = Record::new("AAPL", b'B', 50, 100, 1);
    /// assert_eq!(r.symbol_str(), "AAPL");
    /// ```
    pub fn new(symbol: &str, side: u8, quantity: i32, price: i32, sequence: i32) -> Self {
        let mut raw = [b' '; 4];
        for (dst, src) in raw.iter_mut().zip(symbol.bytes()) {
            *dst = src;
        }
        Record {
            symbol: raw,
            side,
            quantity,
            price,
            sequence,
        }
    }

    /// Symbol as text. Non-UTF-8 bytes are replaced rather than rejected.
    pub fn symbol_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.symbol)
    }

    /// Buy/sell indicator as a character.
    pub fn side_char(&self) -> char {
        char::from(self.side)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} {} {}@{}",
            self.sequence,
            self.symbol_str(),
            self.side_char(),
            self.quantity,
            self.price
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_pads_short_symbol() {
        let r = Record::new("GE", b'S', 1, 2, 3);
        assert_eq!(&r.symbol, b"GE  ");
    }

    #[test]
    fn test_new_truncates_long_symbol() {
        let r = Record::new("GOOGL", b'S', 1, 2, 3);
        assert_eq!(&r.symbol, b"GOOG");
    }

    #[test]
    fn test_display() {
        let r = Record::new("MSFT", b'B', 10, 250, 7);
        assert_eq!(r.to_string(), "#7 MSFT B 10@250");
    }

    #[test]
    fn test_opaque_side_is_preserved() {
        let r = Record::new("AMZN", 0xFF, 1, 1, 1);
        assert_eq!(r.side, 0xFF);
        assert_eq!(r.side_char(), 'ÿ');
    }
}
