use crate::models::Ad;

/// Ads returned by a query, grouped by placement name in server response order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdsResponse {
    placements: Vec<(String, Vec<Ad>)>,
}

impl AdsResponse {
    pub(crate) fn new(placements: Vec<(String, Vec<Ad>)>) -> AdsResponse {
        AdsResponse { placements }
    }

    /// Ads for `placement`. Unknown placements yield an empty slice.
    pub fn placement(&self, placement: &str) -> &[Ad] {
        self.placements
            .iter()
            .find(|(name, _)| name == placement)
            .map(|(_, ads)| ads.as_slice())
            .unwrap_or(&[])
    }

    /// All ads, placement by placement, in response order.
    pub fn all_ads(&self) -> Vec<&Ad> {
        self.placements.iter().flat_map(|(_, ads)| ads).collect()
    }

    /// Placement names in response order.
    pub fn placement_names(&self) -> impl Iterator<Item = &str> {
        self.placements.iter().map(|(name, _)| name.as_str())
    }

    /// Placements with their ads, in response order.
    pub fn placements(&self) -> impl Iterator<Item = (&str, &[Ad])> {
        self.placements
            .iter()
            .map(|(name, ads)| (name.as_str(), ads.as_slice()))
    }

    /// Total number of ads across placements.
    pub fn len(&self) -> usize {
        self.placements.iter().map(|(_, ads)| ads.len()).sum()
    }

    /// `true` if no placement has any ad.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
