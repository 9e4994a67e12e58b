//! Quote-summary modules and the v7 quote snapshot.

use serde_json::Value;

use super::schema::{self, Derived, FieldSpec, at, leaf};
use crate::core::models::{Field, Record};
use crate::core::wire;
use crate::endpoint::SummaryModule;

use super::schema::Kind::{Bool, Date, Nested, Number, Rows, Text, Time};

const PROFILE_COMMON: &[FieldSpec] = &[
    leaf("address1", Text),
    leaf("city", Text),
    leaf("state", Text),
    leaf("zip", Text),
    leaf("country", Text),
    leaf("phone", Text),
    leaf("website", Text),
    leaf("industry", Text),
    leaf("sector", Text),
    leaf("longBusinessSummary", Text),
    leaf("fullTimeEmployees", Number),
];

const OFFICER: &[FieldSpec] = &[
    leaf("name", Text),
    leaf("title", Text),
    leaf("age", Number),
    leaf("yearBorn", Number),
    leaf("totalPay", Number),
];

const ASSET_PROFILE_EXTRA: &[FieldSpec] = &[
    leaf("auditRisk", Number),
    leaf("boardRisk", Number),
    leaf("compensationRisk", Number),
    leaf("shareHolderRightsRisk", Number),
    leaf("overallRisk", Number),
    leaf("companyOfficers", Rows(OFFICER)),
];

const FINANCIAL_DATA: &[FieldSpec] = &[
    leaf("currentPrice", Number),
    leaf("targetHighPrice", Number),
    leaf("targetLowPrice", Number),
    leaf("targetMeanPrice", Number),
    leaf("targetMedianPrice", Number),
    leaf("recommendationMean", Number),
    leaf("recommendationKey", Text),
    leaf("numberOfAnalystOpinions", Number),
    leaf("totalCash", Number),
    leaf("totalCashPerShare", Number),
    leaf("ebitda", Number),
    leaf("totalDebt", Number),
    leaf("quickRatio", Number),
    leaf("currentRatio", Number),
    leaf("totalRevenue", Number),
    leaf("debtToEquity", Number),
    leaf("revenuePerShare", Number),
    leaf("returnOnAssets", Number),
    leaf("returnOnEquity", Number),
    leaf("grossProfits", Number),
    leaf("freeCashflow", Number),
    leaf("operatingCashflow", Number),
    leaf("earningsGrowth", Number),
    leaf("revenueGrowth", Number),
    leaf("grossMargins", Number),
    leaf("ebitdaMargins", Number),
    leaf("operatingMargins", Number),
    leaf("profitMargins", Number),
    leaf("financialCurrency", Text),
];

const FINANCIAL_DATA_DERIVED: &[Derived] = &[
    Derived::Ratio {
        name: "cashToDebt",
        numerator: "totalCash",
        denominator: "totalDebt",
    },
    Derived::Ratio {
        name: "freeCashflowMargin",
        numerator: "freeCashflow",
        denominator: "totalRevenue",
    },
];

const KEY_STATISTICS: &[FieldSpec] = &[
    leaf("enterpriseValue", Number),
    leaf("forwardPE", Number),
    leaf("profitMargins", Number),
    leaf("floatShares", Number),
    leaf("sharesOutstanding", Number),
    leaf("sharesShort", Number),
    leaf("shortRatio", Number),
    leaf("shortPercentOfFloat", Number),
    leaf("heldPercentInsiders", Number),
    leaf("heldPercentInstitutions", Number),
    leaf("beta", Number),
    leaf("bookValue", Number),
    leaf("priceToBook", Number),
    leaf("lastFiscalYearEnd", Date),
    leaf("nextFiscalYearEnd", Date),
    leaf("mostRecentQuarter", Date),
    leaf("earningsQuarterlyGrowth", Number),
    leaf("netIncomeToCommon", Number),
    leaf("trailingEps", Number),
    leaf("forwardEps", Number),
    leaf("pegRatio", Number),
    leaf("lastSplitFactor", Text),
    leaf("lastSplitDate", Date),
    leaf("enterpriseToRevenue", Number),
    leaf("enterpriseToEbitda", Number),
    leaf("52WeekChange", Number),
    leaf("SandP52WeekChange", Number),
    leaf("lastDividendValue", Number),
    leaf("lastDividendDate", Date),
];

const SUMMARY_DETAIL: &[FieldSpec] = &[
    leaf("previousClose", Number),
    leaf("open", Number),
    leaf("dayLow", Number),
    leaf("dayHigh", Number),
    leaf("regularMarketPreviousClose", Number),
    leaf("dividendRate", Number),
    leaf("dividendYield", Number),
    leaf("exDividendDate", Date),
    leaf("payoutRatio", Number),
    leaf("fiveYearAvgDividendYield", Number),
    leaf("beta", Number),
    leaf("trailingPE", Number),
    leaf("forwardPE", Number),
    leaf("volume", Number),
    leaf("averageVolume", Number),
    leaf("averageVolume10days", Number),
    leaf("marketCap", Number),
    leaf("fiftyTwoWeekLow", Number),
    leaf("fiftyTwoWeekHigh", Number),
    leaf("fiftyDayAverage", Number),
    leaf("twoHundredDayAverage", Number),
    leaf("trailingAnnualDividendRate", Number),
    leaf("trailingAnnualDividendYield", Number),
    leaf("currency", Text),
];

const PRICE: &[FieldSpec] = &[
    leaf("symbol", Text),
    leaf("shortName", Text),
    leaf("longName", Text),
    leaf("currency", Text),
    leaf("currencySymbol", Text),
    leaf("exchange", Text),
    leaf("exchangeName", Text),
    leaf("quoteType", Text),
    leaf("marketState", Text),
    leaf("regularMarketPrice", Number),
    leaf("regularMarketChange", Number),
    leaf("regularMarketChangePercent", Number),
    leaf("regularMarketPreviousClose", Number),
    leaf("regularMarketOpen", Number),
    leaf("regularMarketDayHigh", Number),
    leaf("regularMarketDayLow", Number),
    leaf("regularMarketVolume", Number),
    leaf("regularMarketTime", Time),
    leaf("marketCap", Number),
    leaf("preMarketPrice", Number),
    leaf("postMarketPrice", Number),
];

const QUOTE_TYPE: &[FieldSpec] = &[
    leaf("symbol", Text),
    leaf("shortName", Text),
    leaf("longName", Text),
    leaf("exchange", Text),
    leaf("quoteType", Text),
    leaf("market", Text),
    leaf("firstTradeDateEpochUtc", Time),
    leaf("timeZoneFullName", Text),
    leaf("timeZoneShortName", Text),
];

const QUARTERLY_EPS: &[FieldSpec] = &[
    leaf("date", Text),
    leaf("actual", Number),
    leaf("estimate", Number),
];
const YEARLY_FINANCIALS: &[FieldSpec] = &[
    leaf("date", Number),
    leaf("revenue", Number),
    leaf("earnings", Number),
];
const QUARTERLY_FINANCIALS: &[FieldSpec] = &[
    leaf("date", Text),
    leaf("revenue", Number),
    leaf("earnings", Number),
];
const EARNINGS_CHART: &[FieldSpec] = &[
    leaf("quarterly", Rows(QUARTERLY_EPS)),
    leaf("currentQuarterEstimate", Number),
    leaf("currentQuarterEstimateDate", Text),
    leaf("currentQuarterEstimateYear", Number),
    at("nextEarningsDate", &["earningsDate", "0"], Date),
];
const FINANCIALS_CHART: &[FieldSpec] = &[
    leaf("yearly", Rows(YEARLY_FINANCIALS)),
    leaf("quarterly", Rows(QUARTERLY_FINANCIALS)),
];

/// `earningsChart`/`financialsChart` are renamed to `earningsData`/`financialsData`.
const EARNINGS: &[FieldSpec] = &[
    at("earningsData", &["earningsChart"], Nested(EARNINGS_CHART)),
    at("financialsData", &["financialsChart"], Nested(FINANCIALS_CHART)),
    leaf("financialCurrency", Text),
];

const ESG_SCORES: &[FieldSpec] = &[
    leaf("totalEsg", Number),
    leaf("environmentScore", Number),
    leaf("socialScore", Number),
    leaf("governanceScore", Number),
    leaf("ratingYear", Number),
    leaf("ratingMonth", Number),
    leaf("highestControversy", Number),
    leaf("percentile", Number),
    leaf("esgPerformance", Text),
    leaf("peerGroup", Text),
    leaf("adult", Bool),
    leaf("alcoholic", Bool),
    leaf("animalTesting", Bool),
    leaf("catholic", Bool),
    leaf("controversialWeapons", Bool),
    leaf("smallArms", Bool),
    leaf("furLeather", Bool),
    leaf("gambling", Bool),
    leaf("gmo", Bool),
    leaf("militaryContract", Bool),
    leaf("nuclear", Bool),
    leaf("pesticides", Bool),
    leaf("palmOil", Bool),
    leaf("coal", Bool),
    leaf("tobacco", Bool),
];

const CALENDAR_EVENTS: &[FieldSpec] = &[
    leaf("exDividendDate", Date),
    leaf("dividendDate", Date),
    at("earningsDate", &["earnings", "earningsDate", "0"], Date),
    at("earningsAverage", &["earnings", "earningsAverage"], Number),
    at("earningsLow", &["earnings", "earningsLow"], Number),
    at("earningsHigh", &["earnings", "earningsHigh"], Number),
    at("revenueAverage", &["earnings", "revenueAverage"], Number),
    at("revenueLow", &["earnings", "revenueLow"], Number),
    at("revenueHigh", &["earnings", "revenueHigh"], Number),
];

const CURRENT_PRICE: &[FieldSpec] = &[
    leaf("symbol", Text),
    leaf("shortName", Text),
    leaf("longName", Text),
    leaf("currency", Text),
    leaf("exchange", Text),
    leaf("fullExchangeName", Text),
    leaf("marketState", Text),
    leaf("quoteType", Text),
    leaf("regularMarketPrice", Number),
    leaf("regularMarketPreviousClose", Number),
    leaf("regularMarketOpen", Number),
    leaf("regularMarketDayHigh", Number),
    leaf("regularMarketDayLow", Number),
    leaf("regularMarketVolume", Number),
    leaf("regularMarketTime", Time),
    leaf("averageDailyVolume3Month", Number),
    leaf("averageDailyVolume10Day", Number),
    leaf("marketCap", Number),
    leaf("epsTrailingTwelveMonths", Number),
    leaf("fiftyTwoWeekHigh", Number),
    leaf("fiftyTwoWeekLow", Number),
];

const CURRENT_PRICE_DERIVED: &[Derived] = &[
    Derived::Ratio {
        name: "priceToEarnings",
        numerator: "regularMarketPrice",
        denominator: "epsTrailingTwelveMonths",
    },
    Derived::Change {
        name: "percentChange",
        current: "regularMarketPrice",
        base: "regularMarketPreviousClose",
    },
];

const NO_DERIVED: &[Derived] = &[];

fn module_record(module: SummaryModule, node: &Value) -> Record {
    let (specs, derived): (&[FieldSpec], &[Derived]) = match module {
        SummaryModule::AssetProfile => {
            let mut rec = schema::apply(PROFILE_COMMON, node);
            for (k, v) in schema::apply(ASSET_PROFILE_EXTRA, node).iter() {
                rec.insert(k, v.clone());
            }
            return rec;
        }
        SummaryModule::SummaryProfile => (PROFILE_COMMON, NO_DERIVED),
        SummaryModule::FinancialData => (FINANCIAL_DATA, FINANCIAL_DATA_DERIVED),
        SummaryModule::DefaultKeyStatistics => (KEY_STATISTICS, NO_DERIVED),
        SummaryModule::SummaryDetail => (SUMMARY_DETAIL, NO_DERIVED),
        SummaryModule::Price => (PRICE, NO_DERIVED),
        SummaryModule::QuoteType => (QUOTE_TYPE, NO_DERIVED),
        SummaryModule::Earnings => (EARNINGS, NO_DERIVED),
        SummaryModule::EsgScores => (ESG_SCORES, NO_DERIVED),
        SummaryModule::CalendarEvents => (CALENDAR_EVENTS, NO_DERIVED),
    };
    let mut rec = schema::apply(specs, node);
    schema::derive(&mut rec, derived);
    rec
}

/// The per-ticker node of a `quoteSummary` response.
fn summary_node<'a>(body: &'a Value, ticker: &str) -> Option<&'a Value> {
    let result = wire::lookup(body, &["quoteSummary", "result"])?;
    wire::select_ticker(result, ticker)
}

/// One module, flattened. `None` when the module is absent upstream.
pub(crate) fn module(module: SummaryModule, ticker: &str, body: &Value) -> Option<Record> {
    let node = summary_node(body, ticker)?;
    let m = wire::lookup(node, &[module.as_str()])?;
    Some(module_record(module, m))
}

/// Several modules, one nested record each. `None` only when every module is absent.
pub(crate) fn modules(list: &[SummaryModule], ticker: &str, body: &Value) -> Option<Record> {
    let node = summary_node(body, ticker)?;
    let mut rec = Record::new();
    let mut any = false;
    for m in list {
        let field = match wire::lookup(node, &[m.as_str()]) {
            Some(v) => {
                any = true;
                Field::Nested(module_record(*m, v))
            }
            None => Field::Null,
        };
        rec.insert(m.as_str(), field);
    }
    any.then_some(rec)
}

/// The v7 quote snapshot for `ticker`.
pub(crate) fn current_price(ticker: &str, body: &Value) -> Option<Record> {
    let result = wire::lookup(body, &["quoteResponse", "result"])?;
    let node = wire::select_ticker(result, ticker)?;
    let mut rec = schema::apply(CURRENT_PRICE, node);
    schema::derive(&mut rec, CURRENT_PRICE_DERIVED);
    Some(rec)
}
