use serde::{Deserialize, Serialize};

/// Query body for POST /companies/search.
#[derive(Debug, Clone, Serialize)]
pub struct CompanySearchInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(rename = "governmentVendorsOnly")]
    pub government_vendors_only: bool,
    pub limit: u32,
}

/// One company row from the registry. Most fields are optional; registry
/// coverage varies wildly by filing age and jurisdiction.
#[derive(Debug, Clone, Deserialize)]
pub struct CompanyRow {
    pub name: String,
    pub description: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(rename = "streetAddress")]
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub industry: Option<String>,
    #[serde(rename = "employeeCount")]
    pub employee_count: Option<u32>,
    #[serde(rename = "annualRevenue")]
    pub annual_revenue: Option<f64>,
    #[serde(rename = "verifiedVendor", default)]
    pub verified_vendor: bool,
    #[serde(rename = "governmentContractor", default)]
    pub government_contractor: bool,
    #[serde(default)]
    pub certifications: Vec<String>,
    #[serde(rename = "contractNumbers", default)]
    pub contract_numbers: Vec<String>,
    /// Fraction of applicable filings the registry shows as current (0.0-1.0).
    #[serde(rename = "filingCompliance")]
    pub filing_compliance: Option<f32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub companies: Vec<CompanyRow>,
    #[serde(default)]
    pub total: u64,
}
