//! FA(3) document builder.
//!
//! Emits the `Faktura` document accepted by KSeF: header, seller and
//! buyer blocks, the invoice body with per-rate totals, the fixed
//! annotation flags, and one `FaWiersz` per line item. Child order is
//! mandated by the schema, so every element is written in sequence.

use std::io::Cursor;

use chrono::{DateTime, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::config::SellerInfo;
use crate::core::{
    Client, CoreError, CoreResult, Invoice, VatRate, format_money, single_line_address,
};

/// FA(3) target namespace.
pub const FA3_NAMESPACE: &str = "http://crd.gov.pl/wzor/2025/06/25/13775/";

/// Event writer shaped for the FA(3) document: groups nest through
/// closures, leaves are text-only `field`s with optional and monetary
/// variants for the many conditional `P_*` elements. quick-xml escapes
/// all text and attribute values on the way out.
struct DocBuilder {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl DocBuilder {
    fn new() -> CoreResult<Self> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(Self::write_err)?;
        Ok(Self { writer })
    }

    fn write_err(e: std::io::Error) -> CoreError {
        CoreError::Internal(format!("FA(3) document write error: {e}"))
    }

    /// Nested element group; the closure emits the children in order.
    fn group(
        &mut self,
        name: &str,
        body: impl FnOnce(&mut Self) -> CoreResult<()>,
    ) -> CoreResult<()> {
        self.open(name, &[])?;
        body(self)?;
        self.close(name)
    }

    /// Group variant for the root element, which carries the namespace.
    fn group_with_attrs(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
        body: impl FnOnce(&mut Self) -> CoreResult<()>,
    ) -> CoreResult<()> {
        self.open(name, attrs)?;
        body(self)?;
        self.close(name)
    }

    /// Leaf element with text content.
    fn field(&mut self, name: &str, text: &str) -> CoreResult<()> {
        self.open(name, &[])?;
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(Self::write_err)?;
        self.close(name)
    }

    /// Leaf with attributes; `KodFormularza` is the only taker.
    fn field_with_attrs(
        &mut self,
        name: &str,
        text: &str,
        attrs: &[(&str, &str)],
    ) -> CoreResult<()> {
        self.open(name, attrs)?;
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(Self::write_err)?;
        self.close(name)
    }

    /// Leaf emitted only when a value is present.
    fn opt_field(&mut self, name: &str, text: Option<&str>) -> CoreResult<()> {
        match text {
            Some(t) => self.field(name, t),
            None => Ok(()),
        }
    }

    /// Monetary leaf in the fixed two-decimal wire format.
    fn money(&mut self, name: &str, grosze: i64) -> CoreResult<()> {
        self.field(name, &format_money(grosze))
    }

    /// Monetary leaf for per-rate subtotals, skipped for unused rates.
    fn opt_money(&mut self, name: &str, grosze: Option<i64>) -> CoreResult<()> {
        match grosze {
            Some(g) => self.money(name, g),
            None => Ok(()),
        }
    }

    fn open(&mut self, name: &str, attrs: &[(&str, &str)]) -> CoreResult<()> {
        let mut elem = BytesStart::new(name);
        for (key, value) in attrs {
            elem.push_attribute((*key, *value));
        }
        self.writer
            .write_event(Event::Start(elem))
            .map_err(Self::write_err)
    }

    fn close(&mut self, name: &str) -> CoreResult<()> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(Self::write_err)
    }

    fn finish(self) -> CoreResult<String> {
        let bytes = self.writer.into_inner().into_inner();
        String::from_utf8(bytes)
            .map_err(|e| CoreError::Internal(format!("FA(3) document is not UTF-8: {e}")))
    }
}

/// Per-rate net/VAT accumulator for the `P_13_*`/`P_14_*` pairs.
#[derive(Debug, Default)]
struct RateTotals {
    standard: Option<(i64, i64)>,
    reduced8: Option<(i64, i64)>,
    reduced5: Option<(i64, i64)>,
    zero_net: Option<i64>,
    exempt_net: Option<i64>,
    not_subject_net: Option<i64>,
}

impl RateTotals {
    fn collect(invoice: &Invoice) -> Self {
        let mut totals = Self::default();
        for item in &invoice.items {
            match item.vat_rate {
                VatRate::Standard => add_pair(&mut totals.standard, item.net_grosze, item.vat_grosze),
                VatRate::Reduced8 => add_pair(&mut totals.reduced8, item.net_grosze, item.vat_grosze),
                VatRate::Reduced5 => add_pair(&mut totals.reduced5, item.net_grosze, item.vat_grosze),
                VatRate::Zero => add_net(&mut totals.zero_net, item.net_grosze),
                VatRate::Exempt => add_net(&mut totals.exempt_net, item.net_grosze),
                VatRate::NotSubject => add_net(&mut totals.not_subject_net, item.net_grosze),
            }
        }
        totals
    }

    fn any_exempt(&self) -> bool {
        self.exempt_net.is_some()
    }
}

fn add_pair(slot: &mut Option<(i64, i64)>, net: i64, vat: i64) {
    let (n, v) = slot.unwrap_or((0, 0));
    *slot = Some((n + net, v + vat));
}

fn add_net(slot: &mut Option<i64>, net: i64) {
    *slot = Some(slot.unwrap_or(0) + net);
}

/// Build the complete FA(3) document as a UTF-8 string.
///
/// `generated_at` becomes `DataWytworzeniaFa`; passing it in keeps the
/// output deterministic under test. The caller is responsible for
/// writing the result to disk and running the external schema validator.
pub fn build_invoice_xml(
    invoice: &Invoice,
    seller: &SellerInfo,
    buyer: &Client,
    generated_at: DateTime<Utc>,
    system_info: &str,
) -> CoreResult<String> {
    if invoice.items.is_empty() {
        return Err(CoreError::validation(
            "invoice must have at least one item for FA(3) emission",
        ));
    }
    let seller_address = seller.address_line().ok_or_else(|| {
        CoreError::validation("seller address is required for FA(3) emission")
    })?;
    let buyer_address = single_line_address(
        buyer.address.as_deref(),
        buyer.postal_code.as_deref(),
        buyer.city.as_deref(),
    );
    let totals = RateTotals::collect(invoice);

    let mut doc = DocBuilder::new()?;
    doc.group_with_attrs("Faktura", &[("xmlns", FA3_NAMESPACE)], |d| {
        d.group("Naglowek", |d| {
            d.field_with_attrs(
                "KodFormularza",
                "FA",
                &[("kodSystemowy", "FA (3)"), ("wersjaSchemy", "1-0E")],
            )?;
            d.field("WariantFormularza", "3")?;
            d.field(
                "DataWytworzeniaFa",
                &generated_at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            )?;
            d.field("SystemInfo", system_info)
        })?;

        d.group("Podmiot1", |d| {
            d.group("DaneIdentyfikacyjne", |d| {
                d.field("NIP", &seller.nip)?;
                d.field("Nazwa", &seller.name)
            })?;
            d.group("Adres", |d| {
                d.field("KodKraju", "PL")?;
                d.field("AdresL1", &seller_address)
            })?;
            // the whole contact group is omitted when neither field is present
            if seller.email.is_some() || seller.phone.is_some() {
                d.group("DaneKontaktowe", |d| {
                    d.opt_field("Email", seller.email.as_deref())?;
                    d.opt_field("Telefon", seller.phone.as_deref())
                })?;
            }
            Ok(())
        })?;

        d.group("Podmiot2", |d| {
            d.group("DaneIdentyfikacyjne", |d| {
                d.field("NIP", &buyer.nip)?;
                d.field("Nazwa", &buyer.name)
            })?;
            if let Some(address) = &buyer_address {
                d.group("Adres", |d| {
                    d.field("KodKraju", "PL")?;
                    d.field("AdresL1", address)
                })?;
            }
            // Fixed buyer-status flags; other buyer types are not modelled.
            d.field("JST", "2")?;
            d.field("GV", "2")
        })?;

        d.group("Fa", |d| {
            d.field("KodWaluty", &invoice.currency)?;
            d.field("P_1", &invoice.issue_date.to_string())?;
            d.field("P_2", &invoice.invoice_number)?;
            d.field("P_6", &invoice.sale_date.to_string())?;

            if let Some((net, vat)) = totals.standard {
                d.money("P_13_1", net)?;
                d.money("P_14_1", vat)?;
            }
            if let Some((net, vat)) = totals.reduced8 {
                d.money("P_13_2", net)?;
                d.money("P_14_2", vat)?;
            }
            if let Some((net, vat)) = totals.reduced5 {
                d.money("P_13_3", net)?;
                d.money("P_14_3", vat)?;
            }
            d.opt_money("P_13_6_1", totals.zero_net)?;
            d.opt_money("P_13_7", totals.exempt_net)?;
            d.opt_money("P_13_8", totals.not_subject_net)?;
            d.money("P_15", invoice.total_grosze)?;

            d.group("Adnotacje", |d| {
                d.field("P_16", "2")?;
                d.field("P_17", "2")?;
                d.field("P_18", "2")?;
                d.field("P_18A", "2")?;
                d.group("Zwolnienie", |d| {
                    if totals.any_exempt() {
                        d.field("P_19", "1")?;
                        // TODO: carry a configurable legal-basis reference once
                        // the P_19A/P_19B choice is modelled; until then the
                        // bare marker.
                        d.field("P_19C", "zw")
                    } else {
                        d.field("P_19N", "1")
                    }
                })?;
                d.group("NoweSrodkiTransportu", |d| d.field("P_22N", "1"))?;
                d.field("P_23", "2")?;
                d.group("PMarzy", |d| d.field("P_PMarzyN", "1"))
            })?;

            d.field("RodzajFaktury", "VAT")?;

            for (index, item) in invoice.items.iter().enumerate() {
                d.group("FaWiersz", |d| {
                    d.field("NrWierszaFa", &(index + 1).to_string())?;
                    d.field("P_7", &item.name)?;
                    d.field("P_8A", &item.unit)?;
                    d.field("P_8B", &item.quantity)?;
                    d.money("P_9A", item.unit_price_grosze)?;
                    d.money("P_11", item.net_grosze)?;
                    d.field("P_12", item.vat_rate.p12_code())
                })?;
            }
            Ok(())
        })
    })?;
    doc.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{InvoiceItem, InvoiceStatus, PaymentMethod};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seller() -> SellerInfo {
        SellerInfo {
            name: "Jan Kowalski".into(),
            nip: "1111111111".into(),
            street: Some("ul. Długa 5".into()),
            postal_code: Some("00-238".into()),
            city: Some("Warszawa".into()),
            email: Some("jan@firma.pl".into()),
            ..SellerInfo::default()
        }
    }

    fn buyer() -> Client {
        Client {
            id: 1,
            name: "Nabywca Sp. z o.o.".into(),
            nip: "2222222222".into(),
            address: Some("ul. Krótka 2".into()),
            city: Some("Kraków".into()),
            postal_code: Some("30-001".into()),
            email: None,
            phone: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn item(name: &str, qty: &str, price: i64, rate: VatRate, net: i64, vat: i64) -> InvoiceItem {
        InvoiceItem {
            id: 0,
            invoice_id: 0,
            name: name.into(),
            quantity: qty.into(),
            unit: "szt".into(),
            unit_price_grosze: price,
            vat_rate: rate,
            net_grosze: net,
            vat_grosze: vat,
            gross_grosze: net + vat,
            created_at: Utc::now(),
        }
    }

    fn invoice(items: Vec<InvoiceItem>) -> Invoice {
        let subtotal: i64 = items.iter().map(|i| i.net_grosze).sum();
        let tax: i64 = items.iter().map(|i| i.vat_grosze).sum();
        Invoice {
            id: 1,
            invoice_number: "FV/2026/01/0001".into(),
            issue_date: date(2026, 1, 15),
            sale_date: date(2026, 1, 15),
            client_id: 1,
            status: InvoiceStatus::Issued,
            payment_method: PaymentMethod::BankTransfer,
            payment_deadline: None,
            currency: "PLN".into(),
            exchange_rate: None,
            notes: None,
            subtotal_grosze: subtotal,
            tax_grosze: tax,
            total_grosze: subtotal + tax,
            xml_path: None,
            pdf_path: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            items,
        }
    }

    fn generated_at() -> DateTime<Utc> {
        date(2026, 1, 15).and_hms_opt(10, 30, 0).unwrap().and_utc()
    }

    #[test]
    fn header_and_parties() {
        let inv = invoice(vec![item("A", "1", 10000, VatRate::Standard, 10000, 2300)]);
        let xml = build_invoice_xml(&inv, &seller(), &buyer(), generated_at(), "fakturka test")
            .unwrap();

        assert!(xml.contains("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains(r#"<Faktura xmlns="http://crd.gov.pl/wzor/2025/06/25/13775/">"#));
        assert!(xml.contains(
            r#"<KodFormularza kodSystemowy="FA (3)" wersjaSchemy="1-0E">FA</KodFormularza>"#
        ));
        assert!(xml.contains("<WariantFormularza>3</WariantFormularza>"));
        assert!(xml.contains("<DataWytworzeniaFa>2026-01-15T10:30:00Z</DataWytworzeniaFa>"));
        assert!(xml.contains("<SystemInfo>fakturka test</SystemInfo>"));
        assert!(xml.contains("<AdresL1>ul. Długa 5, 00-238 Warszawa</AdresL1>"));
        assert!(xml.contains("<Email>jan@firma.pl</Email>"));
        assert!(xml.contains("<JST>2</JST>"));
        assert!(xml.contains("<GV>2</GV>"));
    }

    #[test]
    fn text_content_is_escaped() {
        let inv = invoice(vec![item(
            r#"Usługa "A" & <B>"#,
            "1",
            10000,
            VatRate::Standard,
            10000,
            2300,
        )]);
        let xml = build_invoice_xml(&inv, &seller(), &buyer(), generated_at(), "t").unwrap();

        assert!(xml.contains("Usługa &quot;A&quot; &amp; &lt;B&gt;"));
        assert!(!xml.contains("<B>"));
    }

    #[test]
    fn single_standard_rate_line() {
        let inv = invoice(vec![item("A", "1", 10000, VatRate::Standard, 10000, 2300)]);
        let xml = build_invoice_xml(&inv, &seller(), &buyer(), generated_at(), "t").unwrap();

        assert!(xml.contains("<P_13_1>100.00</P_13_1>"));
        assert!(xml.contains("<P_14_1>23.00</P_14_1>"));
        assert!(xml.contains("<P_15>123.00</P_15>"));
        assert!(xml.contains("<P_12>23</P_12>"));
        assert!(!xml.contains("<P_13_2>"));
        assert!(!xml.contains("<P_13_7>"));
        assert!(xml.contains("<P_19N>1</P_19N>"));
        assert!(!xml.contains("<P_19C>"));
    }

    #[test]
    fn mixed_rates_emit_only_used_groups() {
        let inv = invoice(vec![
            item("Usługa A", "1", 10000, VatRate::Standard, 10000, 2300),
            item("Usługa B", "2.5", 8000, VatRate::Reduced8, 20000, 1600),
        ]);
        let xml = build_invoice_xml(&inv, &seller(), &buyer(), generated_at(), "t").unwrap();

        assert!(xml.contains("<P_13_1>100.00</P_13_1>"));
        assert!(xml.contains("<P_14_1>23.00</P_14_1>"));
        assert!(xml.contains("<P_13_2>200.00</P_13_2>"));
        assert!(xml.contains("<P_14_2>16.00</P_14_2>"));
        assert!(!xml.contains("<P_13_3>"));
        assert!(xml.contains("<P_15>339.00</P_15>"));
        assert!(xml.contains("<P_8B>2.5</P_8B>"));
    }

    #[test]
    fn exempt_invoice_uses_zwolnienie_group() {
        let inv = invoice(vec![item("Szkolenie", "3", 5000, VatRate::Exempt, 15000, 0)]);
        let xml = build_invoice_xml(&inv, &seller(), &buyer(), generated_at(), "t").unwrap();

        assert!(xml.contains("<P_13_7>150.00</P_13_7>"));
        assert!(!xml.contains("<P_13_1>"));
        assert!(!xml.contains("<P_14_1>"));
        assert!(xml.contains("<P_19>1</P_19>"));
        assert!(xml.contains("<P_19C>zw</P_19C>"));
        assert!(!xml.contains("<P_19N>"));
        assert!(xml.contains("<P_12>zw</P_12>"));
    }

    #[test]
    fn line_order_and_numbering() {
        let inv = invoice(vec![
            item("Pierwsza", "1", 100, VatRate::Standard, 100, 23),
            item("Druga", "1", 200, VatRate::Standard, 200, 46),
        ]);
        let xml = build_invoice_xml(&inv, &seller(), &buyer(), generated_at(), "t").unwrap();

        let first = xml.find("<NrWierszaFa>1</NrWierszaFa>").unwrap();
        let second = xml.find("<NrWierszaFa>2</NrWierszaFa>").unwrap();
        assert!(first < second);
        let pierwsza = xml.find("Pierwsza").unwrap();
        let druga = xml.find("Druga").unwrap();
        assert!(pierwsza < druga);
    }

    #[test]
    fn buyer_without_address_omits_adres_block() {
        let mut b = buyer();
        b.address = None;
        b.city = None;
        b.postal_code = None;
        let inv = invoice(vec![item("A", "1", 100, VatRate::Standard, 100, 23)]);
        let xml = build_invoice_xml(&inv, &seller(), &b, generated_at(), "t").unwrap();

        let podmiot2 = &xml[xml.find("<Podmiot2>").unwrap()..xml.find("</Podmiot2>").unwrap()];
        assert!(!podmiot2.contains("<Adres>"));
    }

    #[test]
    fn seller_without_address_is_rejected() {
        let bare = SellerInfo {
            name: "X".into(),
            nip: "1111111111".into(),
            ..SellerInfo::default()
        };
        let inv = invoice(vec![item("A", "1", 100, VatRate::Standard, 100, 23)]);
        let err = build_invoice_xml(&inv, &bare, &buyer(), generated_at(), "t").unwrap_err();
        assert!(err.to_string().contains("seller address"));
    }

    #[test]
    fn zero_rate_maps_to_kr_tag() {
        let inv = invoice(vec![item("Eksportowa", "1", 10000, VatRate::Zero, 10000, 0)]);
        let xml = build_invoice_xml(&inv, &seller(), &buyer(), generated_at(), "t").unwrap();

        assert!(xml.contains("<P_13_6_1>100.00</P_13_6_1>"));
        assert!(xml.contains("<P_12>0 KR</P_12>"));
    }
}
