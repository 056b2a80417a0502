//! Mapping from NSE symbols to price-history tickers

/// Index aliases accepted in place of a stock symbol
const INDEX_ALIASES: &[(&str, &str)] = &[("NIFTY", "^NSEI"), ("BANKNIFTY", "^NSEBANK")];

const NSE_SUFFIX: &str = ".NS";

/// Normalise a user-entered symbol ("  reliance " -> "RELIANCE")
pub fn normalize(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Provider ticker for a symbol: index aliases map to their index ticker,
/// explicit tickers pass through, everything else is an NSE listing.
pub fn provider_ticker(symbol: &str) -> String {
    let symbol = normalize(symbol);

    if let Some((_, ticker)) = INDEX_ALIASES.iter().find(|(alias, _)| *alias == symbol) {
        return ticker.to_string();
    }

    if symbol.starts_with('^') || symbol.contains(NSE_SUFFIX) {
        return symbol;
    }

    format!("{}{}", symbol, NSE_SUFFIX)
}
