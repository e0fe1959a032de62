//! Server-side PDF rendering for invoices and delivery notes.
//!
//! Documents are single-column A4 layouts drawn with the built-in
//! Helvetica fonts; rendering walks a y cursor down the page and breaks
//! to a fresh page when the item table runs long.

use crate::{
    entities::company_profile::Model as CompanyProfileModel,
    entities::customer::Model as CustomerModel,
    entities::delivery_note::Model as DeliveryNoteModel,
    entities::invoice::Model as InvoiceModel,
    entities::invoice_item::Model as InvoiceItemModel,
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};
use rust_decimal::Decimal;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_LEFT: f32 = 15.0;
const MARGIN_RIGHT: f32 = 195.0;
const PAGE_BREAK_AT: f32 = 40.0;

/// Everything the invoice document shows.
pub struct InvoiceDocument<'a> {
    pub company: Option<&'a CompanyProfileModel>,
    pub customer: &'a CustomerModel,
    pub invoice: &'a InvoiceModel,
    pub items: &'a [InvoiceItemModel],
}

/// Everything the surat jalan shows. Prices never appear on it.
pub struct DeliveryNoteDocument<'a> {
    pub company: Option<&'a CompanyProfileModel>,
    pub customer: &'a CustomerModel,
    pub note: &'a DeliveryNoteModel,
    pub invoice_number: &'a str,
    pub items: &'a [InvoiceItemModel],
}

/// Whole-rupiah amount with dot thousand separators, e.g. `Rp 1.250.000`.
fn format_money(value: Decimal) -> String {
    let rounded = value.round_dp(0);
    let negative = rounded.is_sign_negative();
    let digits = rounded.abs().to_string();

    let mut grouped = String::new();
    let chars: Vec<char> = digits.chars().collect();
    let mut count = 0;
    for i in (0..chars.len()).rev() {
        if count == 3 {
            grouped.push('.');
            count = 0;
        }
        grouped.push(chars[i]);
        count += 1;
    }
    let grouped: String = grouped.chars().rev().collect();

    if negative {
        format!("Rp -{}", grouped)
    } else {
        format!("Rp {}", grouped)
    }
}

fn format_date(value: DateTime<Utc>) -> String {
    value.format("%d-%m-%Y").to_string()
}

fn push_line(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    text: &str,
    font_size: f32,
    x: f32,
    y: f32,
) {
    layer.use_text(text, font_size, Mm(x), Mm(y), font);
}

fn divider(layer: &PdfLayerReference, y: f32) {
    layer.add_line(printpdf::Line {
        points: vec![
            (printpdf::Point::new(Mm(MARGIN_LEFT), Mm(y)), false),
            (printpdf::Point::new(Mm(MARGIN_RIGHT), Mm(y)), false),
        ],
        is_closed: false,
    });
}

struct Page {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    font_bold: IndirectFontRef,
    y: f32,
}

impl Page {
    fn new(title: &str) -> Result<Self, ServiceError> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        let layer = doc.get_page(page).get_layer(layer);
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ServiceError::DocumentError(e.to_string()))?;
        let font_bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ServiceError::DocumentError(e.to_string()))?;
        Ok(Self {
            doc,
            layer,
            font,
            font_bold,
            y: 285.0,
        })
    }

    fn text(&self, text: &str, size: f32, x: f32) {
        push_line(&self.layer, &self.font, text, size, x, self.y);
    }

    fn text_bold(&self, text: &str, size: f32, x: f32) {
        push_line(&self.layer, &self.font_bold, text, size, x, self.y);
    }

    fn divider(&self) {
        divider(&self.layer, self.y);
    }

    fn down(&mut self, amount: f32) {
        self.y -= amount;
    }

    /// Starts a fresh page when the cursor is inside the bottom margin.
    fn break_page_if_needed(&mut self) {
        if self.y >= PAGE_BREAK_AT {
            return;
        }
        let (page, layer) =
            self.doc
                .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = 285.0;
    }

    fn finish(self) -> Result<Vec<u8>, ServiceError> {
        let mut writer = std::io::BufWriter::new(Vec::<u8>::new());
        self.doc
            .save(&mut writer)
            .map_err(|e| ServiceError::DocumentError(e.to_string()))?;
        writer
            .into_inner()
            .map_err(|e| ServiceError::DocumentError(e.to_string()))
    }

    /// Company identity block, top-left. Works with a missing profile so a
    /// fresh install can still print.
    fn company_header(&mut self, company: Option<&CompanyProfileModel>) {
        match company {
            Some(profile) => {
                self.text_bold(&profile.name, 16.0, MARGIN_LEFT);
                self.down(7.0);
                if let Some(address) = &profile.address {
                    self.text(address, 10.0, MARGIN_LEFT);
                    self.down(5.0);
                }
                if let Some(city) = &profile.city {
                    self.text(city, 10.0, MARGIN_LEFT);
                    self.down(5.0);
                }
                if let Some(phone) = &profile.phone {
                    self.text(&format!("Telp: {}", phone), 10.0, MARGIN_LEFT);
                    self.down(5.0);
                }
                if let Some(tax_id) = &profile.tax_id {
                    self.text(&format!("NPWP: {}", tax_id), 10.0, MARGIN_LEFT);
                    self.down(5.0);
                }
            }
            None => {
                self.text_bold("-", 16.0, MARGIN_LEFT);
                self.down(7.0);
            }
        }
    }
}

pub fn render_invoice_pdf(document: &InvoiceDocument) -> Result<Vec<u8>, ServiceError> {
    let mut page = Page::new("Faktur")?;
    let invoice = document.invoice;

    page.company_header(document.company);

    // Title block, top-right
    push_line(&page.layer, &page.font_bold, "FAKTUR", 24.0, 140.0, 285.0);
    push_line(
        &page.layer,
        &page.font_bold,
        &invoice.invoice_number,
        12.0,
        140.0,
        277.0,
    );
    push_line(
        &page.layer,
        &page.font,
        &invoice.invoice_type,
        10.0,
        140.0,
        271.0,
    );

    page.y = 258.0;
    page.divider();
    page.down(10.0);

    let details_top = page.y;
    page.text_bold("Kepada:", 12.0, MARGIN_LEFT);
    page.down(7.0);
    page.text(&document.customer.name, 10.0, MARGIN_LEFT);
    page.down(5.0);
    if let Some(address) = &document.customer.address {
        page.text(address, 10.0, MARGIN_LEFT);
        page.down(5.0);
    }
    if let Some(city) = &document.customer.city {
        page.text(city, 10.0, MARGIN_LEFT);
        page.down(5.0);
    }
    let after_customer = page.y;

    page.y = details_top;
    page.text_bold("Detail:", 12.0, 120.0);
    page.down(7.0);
    page.text(
        &format!("Tanggal: {}", format_date(invoice.invoice_date)),
        10.0,
        120.0,
    );
    page.down(5.0);
    page.text(
        &format!("Jatuh tempo: {}", format_date(invoice.due_date)),
        10.0,
        120.0,
    );
    page.down(5.0);
    page.text(&format!("Status: {}", invoice.status), 10.0, 120.0);

    page.y = after_customer.min(page.y);
    page.down(12.0);

    // Items table
    let x_desc = MARGIN_LEFT;
    let x_qty = 120.0;
    let x_unit = 140.0;
    let x_total = 170.0;

    page.text_bold("Keterangan", 10.0, x_desc);
    page.text_bold("Qty", 10.0, x_qty);
    page.text_bold("Harga", 10.0, x_unit);
    page.text_bold("Jumlah", 10.0, x_total);
    page.down(3.5);
    page.divider();
    page.down(7.0);

    for (idx, item) in document.items.iter().enumerate() {
        page.break_page_if_needed();
        page.text(&format!("{}. {}", idx + 1, item.description), 10.0, x_desc);
        page.text(&item.quantity.to_string(), 10.0, x_qty);
        page.text(&format_money(item.unit_price), 10.0, x_unit);
        page.text(&format_money(item.amount), 10.0, x_total);
        page.down(6.0);
    }

    page.down(2.0);
    page.divider();
    page.down(10.0);
    page.break_page_if_needed();

    // Totals
    page.text("Subtotal:", 11.0, x_unit);
    page.text_bold(&format_money(invoice.subtotal), 11.0, x_total);
    page.down(6.0);
    page.text(
        &format!(
            "PPN ({}%):",
            (invoice.tax_rate * Decimal::ONE_HUNDRED).normalize()
        ),
        11.0,
        x_unit,
    );
    page.text_bold(&format_money(invoice.tax_amount), 11.0, x_total);
    page.down(6.0);
    if invoice.discount_amount > Decimal::ZERO {
        page.text("Diskon:", 11.0, x_unit);
        page.text_bold(&format!("-{}", format_money(invoice.discount_amount)), 11.0, x_total);
        page.down(6.0);
    }
    if invoice.shipping_cost > Decimal::ZERO {
        page.text("Ongkos kirim:", 11.0, x_unit);
        page.text_bold(&format_money(invoice.shipping_cost), 11.0, x_total);
        page.down(6.0);
    }
    page.down(2.0);
    page.text_bold("TOTAL:", 13.0, x_unit);
    page.text_bold(&format_money(invoice.total_amount), 13.0, x_total);
    page.down(7.0);
    if invoice.paid_amount > Decimal::ZERO {
        page.text("Terbayar:", 11.0, x_unit);
        page.text(&format_money(invoice.paid_amount), 11.0, x_total);
        page.down(6.0);
        page.text("Sisa tagihan:", 11.0, x_unit);
        page.text(&format_money(invoice.remaining_amount), 11.0, x_total);
        page.down(6.0);
    }

    // Bank details
    if let Some(profile) = document.company {
        if let Some(bank_name) = &profile.bank_name {
            page.down(8.0);
            page.break_page_if_needed();
            page.text_bold("Pembayaran ke:", 11.0, MARGIN_LEFT);
            page.down(6.0);
            let account = match (&profile.bank_account_number, &profile.bank_account_holder) {
                (Some(number), Some(holder)) => format!("{} {} a.n. {}", bank_name, number, holder),
                (Some(number), None) => format!("{} {}", bank_name, number),
                _ => bank_name.clone(),
            };
            page.text(&account, 10.0, MARGIN_LEFT);
        }
    }

    if let Some(notes) = invoice.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        page.down(12.0);
        page.break_page_if_needed();
        page.text_bold("Catatan:", 11.0, MARGIN_LEFT);
        page.down(6.0);
        for line in notes.lines() {
            if page.y < 20.0 {
                break;
            }
            page.text(line, 10.0, MARGIN_LEFT);
            page.down(5.0);
        }
    }

    page.finish()
}

pub fn render_delivery_note_pdf(document: &DeliveryNoteDocument) -> Result<Vec<u8>, ServiceError> {
    let mut page = Page::new("Surat Jalan")?;
    let note = document.note;

    page.company_header(document.company);

    push_line(
        &page.layer,
        &page.font_bold,
        "SURAT JALAN",
        20.0,
        130.0,
        285.0,
    );
    push_line(
        &page.layer,
        &page.font_bold,
        &note.delivery_number,
        12.0,
        130.0,
        277.0,
    );

    page.y = 258.0;
    page.divider();
    page.down(10.0);

    let details_top = page.y;
    page.text_bold("Kepada:", 12.0, MARGIN_LEFT);
    page.down(7.0);
    page.text(&document.customer.name, 10.0, MARGIN_LEFT);
    page.down(5.0);
    if let Some(address) = &document.customer.address {
        page.text(address, 10.0, MARGIN_LEFT);
        page.down(5.0);
    }
    if let Some(city) = &document.customer.city {
        page.text(city, 10.0, MARGIN_LEFT);
        page.down(5.0);
    }
    let after_customer = page.y;

    page.y = details_top;
    page.text_bold("Detail:", 12.0, 120.0);
    page.down(7.0);
    page.text(
        &format!("Tanggal kirim: {}", format_date(note.delivery_date)),
        10.0,
        120.0,
    );
    page.down(5.0);
    page.text(&format!("No. faktur: {}", document.invoice_number), 10.0, 120.0);
    page.down(5.0);
    page.text(&format!("Pengemudi: {}", note.driver_name), 10.0, 120.0);
    page.down(5.0);
    page.text(
        &format!("No. kendaraan: {}", note.vehicle_number),
        10.0,
        120.0,
    );

    page.y = after_customer.min(page.y);
    page.down(12.0);

    // Goods table, no prices on a surat jalan
    let x_desc = MARGIN_LEFT;
    let x_qty = 160.0;

    page.text_bold("Keterangan", 10.0, x_desc);
    page.text_bold("Qty", 10.0, x_qty);
    page.down(3.5);
    page.divider();
    page.down(7.0);

    for (idx, item) in document.items.iter().enumerate() {
        page.break_page_if_needed();
        page.text(&format!("{}. {}", idx + 1, item.description), 10.0, x_desc);
        page.text(&item.quantity.to_string(), 10.0, x_qty);
        page.down(6.0);
    }

    page.down(2.0);
    page.divider();

    if let Some(notes) = note.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        page.down(10.0);
        page.break_page_if_needed();
        page.text_bold("Catatan:", 11.0, MARGIN_LEFT);
        page.down(6.0);
        for line in notes.lines() {
            if page.y < 30.0 {
                break;
            }
            page.text(line, 10.0, MARGIN_LEFT);
            page.down(5.0);
        }
    }

    // Signature blocks
    page.y = page.y.min(55.0);
    page.text("Pengirim,", 10.0, 30.0);
    page.text("Penerima,", 10.0, 150.0);
    page.down(25.0);
    page.text("(................................)", 10.0, 25.0);
    let recipient = note
        .recipient_name
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .map(|name| format!("({})", name))
        .unwrap_or_else(|| "(................................)".to_string());
    page.text(&recipient, 10.0, 145.0);

    page.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn money_uses_dot_thousand_separators() {
        assert_eq!(format_money(dec!(1_250_000)), "Rp 1.250.000");
        assert_eq!(format_money(dec!(138_000)), "Rp 138.000");
        assert_eq!(format_money(dec!(950)), "Rp 950");
        assert_eq!(format_money(dec!(0)), "Rp 0");
        assert_eq!(format_money(dec!(-12_000)), "Rp -12.000");
    }

    fn fixture_customer() -> CustomerModel {
        CustomerModel {
            id: Uuid::new_v4(),
            name: "Toko Sinar Jaya".to_string(),
            contact_person: Some("Ibu Ratna".to_string()),
            phone: Some("0812-3456-7890".to_string()),
            email: None,
            address: Some("Jl. Pasar Baru No. 12".to_string()),
            city: Some("Bandung".to_string()),
            notes: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn fixture_invoice() -> InvoiceModel {
        InvoiceModel {
            id: Uuid::new_v4(),
            invoice_number: "INV-20260815-A1B2C3".to_string(),
            purchase_order_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            invoice_type: "PRODUCT".to_string(),
            use_delivery_note: true,
            status: "SENT".to_string(),
            payment_status: "UNPAID".to_string(),
            invoice_date: Utc::now(),
            due_date: Utc::now(),
            subtotal: dec!(4_500_000),
            tax_rate: dec!(0.11),
            tax_amount: dec!(495_000),
            discount_amount: dec!(0),
            shipping_cost: dec!(50_000),
            total_amount: dec!(5_045_000),
            paid_amount: dec!(0),
            remaining_amount: dec!(5_045_000),
            notes: Some("Pembayaran transfer sebelum jatuh tempo".to_string()),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn fixture_items(invoice_id: Uuid, count: usize) -> Vec<InvoiceItemModel> {
        (0..count)
            .map(|i| InvoiceItemModel {
                id: Uuid::new_v4(),
                invoice_id,
                product_id: Some(Uuid::new_v4()),
                description: format!("Beras premium 5kg (batch {})", i + 1),
                quantity: 10,
                unit_price: dec!(75_000),
                amount: dec!(750_000),
                created_at: Utc::now(),
            })
            .collect()
    }

    #[test]
    fn invoice_pdf_renders_bytes() {
        let invoice = fixture_invoice();
        let customer = fixture_customer();
        let items = fixture_items(invoice.id, 3);
        let bytes = render_invoice_pdf(&InvoiceDocument {
            company: None,
            customer: &customer,
            invoice: &invoice,
            items: &items,
        })
        .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 500);
    }

    #[test]
    fn long_item_tables_paginate_instead_of_failing() {
        let invoice = fixture_invoice();
        let customer = fixture_customer();
        let items = fixture_items(invoice.id, 60);
        let bytes = render_invoice_pdf(&InvoiceDocument {
            company: None,
            customer: &customer,
            invoice: &invoice,
            items: &items,
        })
        .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn delivery_note_pdf_renders_bytes() {
        let invoice = fixture_invoice();
        let customer = fixture_customer();
        let items = fixture_items(invoice.id, 2);
        let note = DeliveryNoteModel {
            id: Uuid::new_v4(),
            delivery_number: "SJ-20260816-D4E5F6".to_string(),
            invoice_id: invoice.id,
            driver_name: "Pak Joko".to_string(),
            vehicle_number: "B 9981 KYK".to_string(),
            delivery_date: Utc::now(),
            recipient_name: None,
            status: "PENDING".to_string(),
            notes: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        let bytes = render_delivery_note_pdf(&DeliveryNoteDocument {
            company: None,
            customer: &customer,
            note: &note,
            invoice_number: &invoice.invoice_number,
            items: &items,
        })
        .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
