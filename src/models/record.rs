use std::fmt;
use crate::util::{self, TradingDate};

/// 上市（TWSE）或上櫃（TPEx）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exchange {
    Twse,
    Tpex,
}

impl Exchange {
    pub fn code(&self) -> &'static str {
        match self {
            Exchange::Twse => "TWSE",
            Exchange::Tpex => "TPEx",
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// 單一輸出欄位：有資料就是正規化後的數字字串，沒有就是空白
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Figure(Option<String>);

impl Figure {
    pub fn empty() -> Self {
        Figure(None)
    }

    pub fn parse(raw: &str) -> Self {
        Figure(util::clean_number(raw))
    }

    pub fn from_value(value: &serde_json::Value) -> Self {
        Figure(util::number_from_value(value))
    }

    pub fn from_f64(value: f64) -> Self {
        if value.fract() == 0.0 {
            Figure(Some(format!("{}", value as i64)))
        } else {
            Figure(Some(value.to_string()))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.0.as_deref().and_then(|s| s.parse().ok())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_deref().unwrap_or("")
    }
}

impl fmt::Display for Figure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 買進、賣出、買賣超
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeFlow {
    pub buy: Figure,
    pub sell: Figure,
    pub net: Figure,
}

/// 三大法人買賣金額總表（BFI82U）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketSummary {
    pub foreign: TradeFlow,
    pub trust: TradeFlow,
    pub dealer: TradeFlow,
    pub total_net: Figure,
}

impl MarketSummary {
    pub fn figures(&self) -> [&Figure; 10] {
        [
            &self.foreign.buy, &self.foreign.sell, &self.foreign.net,
            &self.trust.buy, &self.trust.sell, &self.trust.net,
            &self.dealer.buy, &self.dealer.sell, &self.dealer.net,
            &self.total_net,
        ]
    }
}

/// 個股三大法人買賣超
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstitutionalNet {
    pub foreign: Figure,
    pub trust: Figure,
    pub dealer: Figure,
    pub total: Figure,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SecurityQuote {
    pub exchange: Exchange,
    pub symbol: String,
    pub close: Figure,
    pub institutional: InstitutionalNet,
}

impl SecurityQuote {
    /// 該日完全沒有資料的個股
    pub fn unpublished(exchange: Exchange, symbol: &str) -> Self {
        Self {
            exchange,
            symbol: symbol.to_string(),
            close: Figure::empty(),
            institutional: InstitutionalNet::default(),
        }
    }

    pub fn figures(&self) -> [&Figure; 5] {
        [
            &self.close,
            &self.institutional.foreign,
            &self.institutional.trust,
            &self.institutional.dealer,
            &self.institutional.total,
        ]
    }
}

/// One run's worth of data, securities kept in watchlist order.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRecord {
    pub date: TradingDate,
    pub summary: MarketSummary,
    pub securities: Vec<SecurityQuote>,
}

impl DailyRecord {
    pub fn all_figures(&self) -> impl Iterator<Item = &Figure> {
        self.summary
            .figures()
            .into_iter()
            .chain(self.securities.iter().flat_map(|s| s.figures()))
    }

    pub fn empty_count(&self) -> usize {
        self.all_figures().filter(|f| f.is_empty()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn figure_renders_empty_for_missing_data() {
        assert_eq!(Figure::parse("--").to_string(), "");
        assert_eq!(Figure::parse("0").to_string(), "0");
        assert_eq!(Figure::parse("1,025.00").to_string(), "1025.00");
    }

    #[test]
    fn figure_from_f64_drops_integral_fraction() {
        assert_eq!(Figure::from_f64(1234.0).as_str(), "1234");
        assert_eq!(Figure::from_f64(-5.5).as_str(), "-5.5");
    }

    #[test]
    fn counts_empty_figures_across_record() {
        let record = DailyRecord {
            date: TradingDate::parse("20251031").unwrap(),
            summary: MarketSummary::default(),
            securities: vec![SecurityQuote::unpublished(Exchange::Twse, "2330")],
        };
        assert_eq!(record.all_figures().count(), 15);
        assert_eq!(record.empty_count(), 15);
    }
}
