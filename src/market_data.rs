//! Builds the price matrix islands load at init: closing prices of a random
//! sample of large-cap US equities, restricted to the trading dates every
//! sampled ticker has in common.

use anyhow::{anyhow, bail, Context, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::time::Duration;
use tracing::{info, warn};

/// Closing price per date (`YYYY-MM-DD`, so lexical order is chronological).
pub type PriceHistory = BTreeMap<String, f64>;

pub const STOOQ_DAILY_URL: &str = "https://stooq.com/q/d/l/";
pub const COURTESY_PAUSE: Duration = Duration::from_millis(200);

pub const UNIVERSE: [&str; 100] = [
    "AAPL", "MSFT", "AMZN", "NVDA", "META", "GOOGL", "GOOG", "TSLA", "JPM", "JNJ", "V", "PG",
    "XOM", "HD", "UNH", "MA", "BAC", "PEP", "COST", "PFE", "DIS", "KO", "CSCO", "T", "ABT",
    "INTC", "MRK", "WMT", "ORCL", "CVX", "NKE", "LLY", "MCD", "DHR", "ACN", "MDT", "AMGN", "BMY",
    "TXN", "NEE", "IBM", "HON", "AMD", "CAT", "GS", "GE", "UPS", "UNP", "QCOM", "ADBE", "AVGO",
    "CRM", "LIN", "ABBV", "ABNB", "BKNG", "SPGI", "BLK", "ADP", "ISRG", "ELV", "HCA", "TMO", "LOW",
    "MS", "AXP", "C", "DE", "RTX", "LMT", "PM", "MDLZ", "SBUX", "INTU", "AMAT", "NOW", "ADI",
    "LRCX", "MU", "PLD", "EQIX", "CCI", "CB", "PGR", "SO", "DUK", "REGN", "VRTX", "PANW", "COP",
    "OXY", "CSX", "NSC", "KMB", "CL", "MO", "BK", "USB", "EOG", "TGT",
];

/// Picks `count` distinct tickers at random (all of them if `count` exceeds the universe).
pub fn sample_tickers<R: Rng + ?Sized>(
    universe: &[&str],
    count: usize,
    rng: &mut R,
) -> Result<Vec<String>> {
    if count == 0 {
        bail!("Number of assets must be greater than zero");
    }
    let mut shuffled: Vec<&str> = universe.to_vec();
    shuffled.shuffle(rng);
    shuffled.truncate(count.min(universe.len()));
    Ok(shuffled.into_iter().map(String::from).collect())
}

fn column(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|header| header.eq_ignore_ascii_case(name))
        .ok_or_else(|| anyhow!("Price history has no `{name}` column"))
}

/// Parses a daily price CSV into closing prices, locating the `Date` and
/// `Close` columns by header name. Rows missing either field, or with an
/// empty, `null` or unparseable close, are skipped.
pub fn parse_history(body: &str) -> Result<PriceHistory> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());
    let headers = reader.headers()?.clone();
    let date_column = column(&headers, "Date")?;
    let close_column = column(&headers, "Close")?;

    let history = reader
        .records()
        .filter_map(|record| record.ok())
        .filter_map(|record| {
            let date = record.get(date_column).filter(|date| !date.is_empty())?;
            let close = record.get(close_column)?;
            if close.is_empty() || close == "null" {
                return None;
            }
            close
                .parse::<f64>()
                .ok()
                .map(|price| (date.to_string(), price))
        })
        .collect();
    Ok(history)
}

pub async fn fetch_history(client: &reqwest::Client, ticker: &str) -> Result<PriceHistory> {
    let symbol = format!("{}.us", ticker.to_lowercase());
    let response = client
        .get(STOOQ_DAILY_URL)
        .query(&[("s", symbol.as_str()), ("i", "d")])
        .send()
        .await
        .with_context(|| format!("Failed to fetch {ticker}"))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .with_context(|| format!("Failed to read history body for {ticker}"))?;
    if !status.is_success() {
        bail!("Status {} while fetching {}: {}", status.as_u16(), ticker, body);
    }

    let history =
        parse_history(&body).with_context(|| format!("Unreadable history for {ticker}"))?;
    if history.is_empty() {
        bail!("No price points returned for {ticker}");
    }
    Ok(history)
}

/// Dates present in every history, ascending.
pub fn common_dates<'a, I>(histories: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a PriceHistory>,
{
    let mut histories = histories.into_iter();
    let Some(first) = histories.next() else {
        return BTreeSet::new();
    };
    let mut dates: BTreeSet<String> = first.keys().cloned().collect();
    for history in histories {
        dates.retain(|date| history.contains_key(date));
    }
    dates
}

/// Writes `date,T1,T2,...` followed by one row per common date, prices to six
/// decimals.
pub fn write_matrix<W: Write>(
    writer: &mut W,
    tickers: &[String],
    histories: &BTreeMap<String, PriceHistory>,
    dates: &BTreeSet<String>,
) -> Result<()> {
    if dates.is_empty() {
        bail!("No trading dates in common between the selected assets");
    }
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(std::iter::once("date").chain(tickers.iter().map(String::as_str)))?;
    for date in dates {
        let mut row = Vec::with_capacity(tickers.len() + 1);
        row.push(date.clone());
        for ticker in tickers {
            let price = histories
                .get(ticker)
                .and_then(|history| history.get(date))
                .ok_or_else(|| anyhow!("Missing {ticker} price on {date}"))?;
            row.push(format!("{price:.6}"));
        }
        csv_writer.write_record(&row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatrixSummary {
    pub tickers: Vec<String>,
    pub trading_days: usize,
}

/// Samples `count` tickers, downloads their histories and writes the matrix.
pub async fn prepare_price_matrix<W, R>(
    client: &reqwest::Client,
    count: usize,
    rng: &mut R,
    writer: &mut W,
) -> Result<MatrixSummary>
where
    W: Write,
    R: Rng + ?Sized,
{
    let tickers = sample_tickers(&UNIVERSE, count, rng)?;
    info!(assets = tickers.len(), ?tickers, "Sampled assets");

    let mut histories = BTreeMap::new();
    for (index, ticker) in tickers.iter().enumerate() {
        let history = fetch_history(client, ticker).await?;
        info!(ticker = %ticker, points = history.len(), "Fetched price history");
        histories.insert(ticker.clone(), history);
        if index + 1 < tickers.len() {
            tokio::time::sleep(COURTESY_PAUSE).await;
        }
    }

    let dates = common_dates(histories.values());
    if dates.is_empty() {
        warn!("Selected assets share no trading dates");
    }
    write_matrix(writer, &tickers, &histories, &dates)?;
    Ok(MatrixSummary {
        tickers,
        trading_days: dates.len(),
    })
}
