//! Excel export of active listings with price estimates

use chrono::Utc;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use std::collections::HashMap;
use std::path::Path;

use souq_domain::model::{PriceEstimate, VehicleListing};
use souq_domain::service::deal_ratio;
use souq_types::{Error, ListingId, Result};

use crate::app::Services;

fn xlsx_err(e: XlsxError) -> Error {
    Error::Export(e.to_string())
}

/// Export every active listing; returns the number of rows written
pub fn export_active_listings(services: &Services, output_path: &Path) -> Result<usize> {
    let listings = services.repos.listings.find_active()?;
    let estimates = services.pricing.estimate_many(&listings)?;
    export_listings(&listings, &estimates, output_path)?;
    Ok(listings.len())
}

/// Export listings to an Excel file
pub fn export_listings(
    listings: &[VehicleListing],
    estimates: &HashMap<ListingId, PriceEstimate>,
    output_path: &Path,
) -> Result<()> {
    let mut workbook = Workbook::new();

    let summary_sheet = workbook.add_worksheet();
    write_summary_sheet(summary_sheet, listings, estimates)?;

    let details_sheet = workbook.add_worksheet();
    write_details_sheet(details_sheet, listings, estimates)?;

    workbook.save(output_path).map_err(xlsx_err)?;
    tracing::info!(path = %output_path.display(), rows = listings.len(), "exported listings");
    Ok(())
}

fn write_summary_sheet(
    sheet: &mut Worksheet,
    listings: &[VehicleListing],
    estimates: &HashMap<ListingId, PriceEstimate>,
) -> Result<()> {
    sheet.set_name("Summary").map_err(xlsx_err)?;
    let header_format = Format::new().set_bold();
    let money = Format::new().set_num_format("#,##0");

    sheet
        .write_string_with_format(0, 0, "Souq Listings Report", &header_format)
        .map_err(xlsx_err)?;
    sheet.write_string(2, 0, "Generated:").map_err(xlsx_err)?;
    sheet
        .write_string(2, 1, Utc::now().to_rfc3339())
        .map_err(xlsx_err)?;
    sheet.write_string(3, 0, "Active listings:").map_err(xlsx_err)?;
    sheet
        .write_number(3, 1, listings.len() as f64)
        .map_err(xlsx_err)?;
    sheet.write_string(4, 0, "With estimate:").map_err(xlsx_err)?;
    sheet
        .write_number(4, 1, estimates.len() as f64)
        .map_err(xlsx_err)?;

    // Per-make counts and mean asking price
    sheet
        .write_string_with_format(6, 0, "Make", &header_format)
        .map_err(xlsx_err)?;
    sheet
        .write_string_with_format(6, 1, "Listings", &header_format)
        .map_err(xlsx_err)?;
    sheet
        .write_string_with_format(6, 2, "Mean price (EGP)", &header_format)
        .map_err(xlsx_err)?;

    let mut by_make: HashMap<&str, (usize, f64)> = HashMap::new();
    for listing in listings {
        let entry = by_make.entry(listing.make.label()).or_default();
        entry.0 += 1;
        entry.1 += listing.price;
    }
    let mut makes: Vec<_> = by_make.into_iter().collect();
    makes.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then_with(|| a.0.cmp(b.0)));

    for (i, (make, (count, total))) in makes.iter().enumerate() {
        let row = 7 + i as u32;
        sheet.write_string(row, 0, *make).map_err(xlsx_err)?;
        sheet
            .write_number(row, 1, *count as f64)
            .map_err(xlsx_err)?;
        sheet
            .write_number_with_format(row, 2, total / *count as f64, &money)
            .map_err(xlsx_err)?;
    }
    sheet.set_column_width(0, 20).map_err(xlsx_err)?;
    sheet.set_column_width(2, 18).map_err(xlsx_err)?;

    Ok(())
}

fn write_details_sheet(
    sheet: &mut Worksheet,
    listings: &[VehicleListing],
    estimates: &HashMap<ListingId, PriceEstimate>,
) -> Result<()> {
    sheet.set_name("Listings").map_err(xlsx_err)?;
    let header_format = Format::new().set_bold();
    let money = Format::new().set_num_format("#,##0");
    let percent = Format::new().set_num_format("0.0%");

    let headers = [
        "Id",
        "Make",
        "Model",
        "Year",
        "Condition",
        "Mileage (km)",
        "Governorate",
        "Seller",
        "Price (EGP)",
        "Estimate (EGP)",
        "Low",
        "High",
        "Confidence",
        "Below estimate",
    ];
    for (col, header) in headers.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, *header, &header_format)
            .map_err(xlsx_err)?;
    }

    for (i, listing) in listings.iter().enumerate() {
        let row = (i + 1) as u32;
        sheet.write_string(row, 0, &listing.id).map_err(xlsx_err)?;
        sheet
            .write_string(row, 1, listing.make.label())
            .map_err(xlsx_err)?;
        sheet.write_string(row, 2, &listing.model).map_err(xlsx_err)?;
        sheet
            .write_number(row, 3, listing.year as f64)
            .map_err(xlsx_err)?;
        sheet
            .write_string(row, 4, listing.condition.label())
            .map_err(xlsx_err)?;
        sheet
            .write_number(row, 5, listing.mileage_km as f64)
            .map_err(xlsx_err)?;
        sheet
            .write_string(row, 6, listing.governorate.label())
            .map_err(xlsx_err)?;
        sheet.write_string(row, 7, &listing.seller).map_err(xlsx_err)?;
        sheet
            .write_number_with_format(row, 8, listing.price, &money)
            .map_err(xlsx_err)?;

        if let Some(est) = estimates.get(&listing.id) {
            sheet
                .write_number_with_format(row, 9, est.point, &money)
                .map_err(xlsx_err)?;
            sheet
                .write_number_with_format(row, 10, est.low, &money)
                .map_err(xlsx_err)?;
            sheet
                .write_number_with_format(row, 11, est.high, &money)
                .map_err(xlsx_err)?;
            sheet
                .write_number(row, 12, est.confidence)
                .map_err(xlsx_err)?;
            if let Some(ratio) = deal_ratio(listing.price, est) {
                sheet
                    .write_number_with_format(row, 13, ratio, &percent)
                    .map_err(xlsx_err)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use souq_domain::model::{EstimateMethod, ListingStatus};
    use souq_types::{Governorate, VehicleCondition, VehicleMake};

    #[test]
    fn test_export_writes_file() {
        let listing = VehicleListing {
            id: "l1".to_string(),
            seller: "u1".to_string(),
            make: VehicleMake::Toyota,
            model: "Corolla".to_string(),
            year: 2019,
            condition: VehicleCondition::Good,
            mileage_km: 80_000,
            governorate: Governorate::Cairo,
            price: 750_000.0,
            status: ListingStatus::Active,
            created_at: Utc::now(),
            seed_key: None,
        };
        let mut estimates = HashMap::new();
        estimates.insert(
            "l1".to_string(),
            PriceEstimate {
                point: 800_000.0,
                low: 720_000.0,
                high: 880_000.0,
                confidence: 0.7,
                comparables_used: 6,
                method: EstimateMethod::Comparables,
                currency: "EGP".to_string(),
            },
        );

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listings.xlsx");
        export_listings(&[listing], &estimates, &path).unwrap();
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
