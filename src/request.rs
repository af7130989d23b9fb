use serde::{Deserialize, Serialize};

/// Report kinds offered by the API. Each has its own creation endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Product {
    /// SEO audit.
    Scan,
    /// AI visibility testing.
    Signal,
    /// Multi-AI strategic advisory.
    Solutions,
}

impl Product {
    pub fn as_str(&self) -> &'static str {
        match self {
            Product::Scan => "scan",
            Product::Signal => "signal",
            Product::Solutions => "solutions",
        }
    }
}

impl std::fmt::Display for Product {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanTier {
    /// 1 credit.
    #[default]
    Basic,
    /// 2 credits.
    Premium,
}

impl ScanTier {
    pub fn credits(&self) -> u32 {
        match self {
            ScanTier::Basic => 1,
            ScanTier::Premium => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalTier {
    /// 1 credit.
    #[default]
    Basic,
    /// 2 credits.
    Pro,
}

impl SignalTier {
    pub fn credits(&self) -> u32 {
        match self {
            SignalTier::Basic => 1,
            SignalTier::Pro => 2,
        }
    }
}

/// Body of `POST /reports/scan`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanRequest {
    /// Website to audit.
    pub url: String,
    pub brand_name: String,
    /// Address that receives the completion email.
    pub email: String,
    pub tier: ScanTier,
}

/// Body of `POST /reports/signal`.
///
/// `pain_points` and `direct_competitors` are plain strings. The API rejects
/// JSON lists for these fields, so pass competitors comma-separated
/// (`"Shopify, BigCommerce"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignalRequest {
    pub url: String,
    pub brand_name: String,
    pub email: String,
    pub industry: String,
    /// Primary market location.
    pub location: String,
    /// Target customer description.
    pub persona: String,
    pub pain_points: String,
    /// Brand positioning.
    pub brand_details: String,
    pub direct_competitors: String,
    pub tier: SignalTier,
}

/// Body of `POST /reports/solutions`.
///
/// Solutions always runs on the Pro tier, so no tier is sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SolutionsRequest {
    pub brand_name: String,
    pub email: String,
    pub business_story: String,
    /// Key decision or challenge being faced.
    pub decision: String,
    /// What success looks like.
    pub success: String,
    pub timeline: String,
    /// Business scale (revenue, employees, ...).
    pub scale_indicator: String,
}

impl SolutionsRequest {
    pub const TIER: SignalTier = SignalTier::Pro;
}

/// A report creation request, one variant per product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportRequest {
    Scan(ScanRequest),
    Signal(SignalRequest),
    Solutions(SolutionsRequest),
}

impl ReportRequest {
    pub fn product(&self) -> Product {
        match self {
            ReportRequest::Scan(_) => Product::Scan,
            ReportRequest::Signal(_) => Product::Signal,
            ReportRequest::Solutions(_) => Product::Solutions,
        }
    }

    /// Credits the remote account is charged for this request, according to
    /// the published tier pricing. The authoritative figure is
    /// `credits_used` in the creation response.
    pub fn expected_credits(&self) -> u32 {
        match self {
            ReportRequest::Scan(r) => r.tier.credits(),
            ReportRequest::Signal(r) => r.tier.credits(),
            ReportRequest::Solutions(_) => SolutionsRequest::TIER.credits(),
        }
    }

    pub fn brand_name(&self) -> &str {
        match self {
            ReportRequest::Scan(r) => &r.brand_name,
            ReportRequest::Signal(r) => &r.brand_name,
            ReportRequest::Solutions(r) => &r.brand_name,
        }
    }
}

// The product is carried by the endpoint path, so only the record is sent.
impl Serialize for ReportRequest {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ReportRequest::Scan(r) => r.serialize(serializer),
            ReportRequest::Signal(r) => r.serialize(serializer),
            ReportRequest::Solutions(r) => r.serialize(serializer),
        }
    }
}

impl From<ScanRequest> for ReportRequest {
    fn from(r: ScanRequest) -> Self {
        ReportRequest::Scan(r)
    }
}

impl From<SignalRequest> for ReportRequest {
    fn from(r: SignalRequest) -> Self {
        ReportRequest::Signal(r)
    }
}

impl From<SolutionsRequest> for ReportRequest {
    fn from(r: SolutionsRequest) -> Self {
        ReportRequest::Solutions(r)
    }
}
