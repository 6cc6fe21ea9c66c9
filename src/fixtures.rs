/// Built-in listing dataset and fixture validation
///
/// The catalog serves a fixed set of listings. They are embedded as JSON,
/// checked against the listing invariants and have owner phones normalized
/// before the catalog takes ownership of them.
use crate::errors::CatalogError;
use crate::models::ListingRecord;
use phonenumber::country::Id as CountryId;
use phonenumber::Mode;

const BUILTIN_LISTINGS: &str = include_str!("../data/listings.json");

/// Parses and validates the embedded dataset.
pub fn builtin_listings() -> Result<Vec<ListingRecord>, CatalogError> {
    let listings: Vec<ListingRecord> = serde_json::from_str(BUILTIN_LISTINGS)
        .map_err(|e| CatalogError::InvalidFixture(format!("embedded listings: {}", e)))?;
    prepare(listings)
}

/// Validates every record and normalizes owner phones.
///
/// Fails on the first record with a non-positive rent, bedroom count or
/// area, a non-finite coordinate, or a duplicate id.
pub fn prepare(listings: Vec<ListingRecord>) -> Result<Vec<ListingRecord>, CatalogError> {
    let mut seen = std::collections::HashSet::new();

    listings
        .into_iter()
        .map(|mut listing| {
            validate_listing(&listing)?;
            if !seen.insert(listing.id.clone()) {
                return Err(CatalogError::InvalidFixture(format!(
                    "duplicate listing id {}",
                    listing.id
                )));
            }
            listing.owner_phone = listing.owner_phone.take().and_then(|raw| {
                let (valid, normalized) = validate_in_phone(&raw);
                if valid {
                    Some(normalized)
                } else {
                    tracing::warn!("Dropping invalid owner phone on {}: {}", listing.id, raw);
                    None
                }
            });
            Ok(listing)
        })
        .collect()
}

fn validate_listing(listing: &ListingRecord) -> Result<(), CatalogError> {
    let invalid = |what: &str| {
        Err(CatalogError::InvalidFixture(format!(
            "listing {} has {}",
            listing.id, what
        )))
    };

    if listing.id.trim().is_empty() {
        return invalid("an empty id");
    }
    if listing.rent == 0 {
        return invalid("zero rent");
    }
    if listing.bedrooms == 0 {
        return invalid("zero bedrooms");
    }
    if !(listing.area.is_finite() && listing.area > 0.0) {
        return invalid("a non-positive area");
    }
    if !(listing.lat.is_finite() && listing.lng.is_finite()) {
        return invalid("non-finite coordinates");
    }
    Ok(())
}

/// Validate and normalize an Indian phone number to E.164.
///
/// Returns `(true, "+919876543210")` on success, `(false, reason)` otherwise.
pub fn validate_in_phone(raw: &str) -> (bool, String) {
    if raw.trim().is_empty() || raw.len() < 8 {
        return (false, "Phone too short".to_string());
    }

    match phonenumber::parse(Some(CountryId::IN), raw) {
        Ok(number) => {
            if phonenumber::is_valid(&number) {
                let formatted = number.format().mode(Mode::E164).to_string();
                tracing::debug!("Valid IN phone: {} -> {}", raw, formatted);
                (true, formatted)
            } else {
                (false, "Invalid Indian phone number".to_string())
            }
        }
        Err(e) => (false, format!("Parse error: {:?}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_listings_load() {
        let listings = builtin_listings().unwrap();
        assert_eq!(listings.len(), 9);

        let sources: std::collections::HashSet<_> =
            listings.iter().map(|l| l.source.as_str()).collect();
        assert_eq!(sources.len(), 3);

        for listing in &listings {
            assert!(listing.rent > 0 && listing.bedrooms > 0 && listing.area > 0.0);
            if let Some(ref phone) = listing.owner_phone {
                assert!(phone.starts_with("+91"), "not E.164: {}", phone);
            }
        }
    }

    #[test]
    fn test_zero_rent_rejected() {
        let mut listings = builtin_listings().unwrap();
        listings[0].rent = 0;

        let err = prepare(listings).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidFixture(ref m) if m.contains("zero rent")));
    }

    #[test]
    fn test_zero_area_and_bedrooms_rejected() {
        let mut listings = builtin_listings().unwrap();
        listings[1].area = 0.0;
        assert!(prepare(listings).is_err());

        let mut listings = builtin_listings().unwrap();
        listings[2].bedrooms = 0;
        assert!(prepare(listings).is_err());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut listings = builtin_listings().unwrap();
        listings[1].id = listings[0].id.clone();
        assert!(prepare(listings).is_err());
    }

    #[test]
    fn test_garbage_phone_rejected() {
        let (valid, _) = validate_in_phone("123");
        assert!(!valid);
        let (valid, _) = validate_in_phone("not a phone number");
        assert!(!valid);
    }
}
