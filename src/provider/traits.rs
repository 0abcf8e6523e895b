use crate::model::{
    CandleRequest, CompanyProfile, CryptoAsset, CryptoMatch, PriceBar, ProviderError, QuoteSnapshot,
    RawNews, StockMetrics, SymbolMatch,
};
use chrono::NaiveDate;

#[async_trait::async_trait]
pub trait StockDataProvider: Send + Sync {
    async fn quote(&self, symbol: &str) -> Result<QuoteSnapshot, ProviderError>;
    async fn profile(&self, symbol: &str) -> Result<CompanyProfile, ProviderError>;
    async fn metrics(&self, symbol: &str) -> Result<StockMetrics, ProviderError>;
    async fn search(&self, query: &str) -> Result<Vec<SymbolMatch>, ProviderError>;
}

#[async_trait::async_trait]
pub trait CandleProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn candles(&self, req: &CandleRequest) -> Result<Vec<PriceBar>, ProviderError>;
}

#[async_trait::async_trait]
pub trait CryptoDataProvider: Send + Sync {
    async fn asset(&self, id: &str) -> Result<CryptoAsset, ProviderError>;
    async fn ohlc(&self, id: &str, days: u32) -> Result<Vec<PriceBar>, ProviderError>;
    async fn top_assets(&self, limit: usize) -> Result<Vec<CryptoAsset>, ProviderError>;
    async fn search(&self, query: &str) -> Result<Vec<CryptoMatch>, ProviderError>;
}

#[async_trait::async_trait]
pub trait NewsProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn market_news(&self, category: &str) -> Result<Vec<RawNews>, ProviderError>;

    async fn company_news(
        &self,
        symbol: &str,
        _from: NaiveDate,
        _to: NaiveDate,
    ) -> Result<Vec<RawNews>, ProviderError> {
        Err(ProviderError::NoData(format!(
            "{} has no company news for {symbol}",
            self.name()
        )))
    }
}
