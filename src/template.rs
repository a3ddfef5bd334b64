//! Markup templates for the printable documents. Templates are pure:
//! a record in, a markup string out, inline styles only, every
//! user-supplied field escaped. Rendering cannot fail; absent optional
//! fields fall back to an empty cell or a "-" placeholder.

use crate::format::{escape_html, escape_multiline, format_amount_korean, format_currency, format_date};
use crate::record::{
    AirPermitRecord, ContractRecord, FacilityRecord, OutletRecord, PaymentTerms,
    PhIndicatorLocation, PurchaseOrderRecord, TemperatureSensorLength, TemperatureSensorType,
    VpnType, facility_display_number,
};

const FONT_STACK: &str =
    "'Noto Sans KR', 'Malgun Gothic', 'Apple SD Gothic Neo', '맑은 고딕', Arial, sans-serif";

/// How a rendered capture maps onto pages: flowed and sliced, or scaled
/// onto a single page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PageFill {
    Flow,
    FitSingle,
}

#[derive(Debug, Clone)]
pub(crate) struct RenderedSection {
    pub html: String,
    pub fill: PageFill,
}

/// One logical document section of an export job. Each section is
/// rendered and captured independently and starts on a fresh page.
#[derive(Debug, Clone)]
pub enum Section {
    PurchaseOrder(PurchaseOrderRecord),
    Contract(ContractRecord),
    AirPermit(AirPermitRecord),
}

impl Section {
    /// Catalog code, shared with the storage collaborators.
    pub fn doc_code(&self) -> &'static str {
        match self {
            Section::PurchaseOrder(_) => "purchase_order",
            Section::Contract(record) => record.kind.doc_code(),
            Section::AirPermit(_) => "air_permit",
        }
    }

    pub fn entity_name(&self) -> &str {
        match self {
            Section::PurchaseOrder(record) => &record.business_name,
            Section::Contract(record) => &record.business_name,
            Section::AirPermit(record) => &record.business_name,
        }
    }

    pub fn title(&self) -> &'static str {
        docpress_catalog_contract::doc_type(self.doc_code())
            .map(|def| def.title)
            .unwrap_or("문서")
    }

    pub(crate) fn render(&self) -> Vec<RenderedSection> {
        match self {
            Section::PurchaseOrder(record) => {
                let mut sections = vec![RenderedSection {
                    html: render_purchase_order_html(record),
                    fill: PageFill::Flow,
                }];
                if let Some(permit) = &record.air_permit {
                    sections.push(RenderedSection {
                        html: render_air_permit_html(permit),
                        fill: PageFill::Flow,
                    });
                }
                sections
            }
            Section::Contract(record) => vec![
                RenderedSection {
                    html: render_contract_cover_html(record),
                    fill: PageFill::FitSingle,
                },
                RenderedSection {
                    html: render_contract_terms_html(record),
                    fill: PageFill::FitSingle,
                },
                RenderedSection {
                    html: render_contract_closing_html(record),
                    fill: PageFill::FitSingle,
                },
            ],
            Section::AirPermit(record) => vec![RenderedSection {
                html: render_air_permit_html(record),
                fill: PageFill::Flow,
            }],
        }
    }
}

fn opt(value: Option<&str>) -> String {
    escape_html(value.unwrap_or(""))
}

fn opt_dash(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => escape_html(v),
        _ => "-".to_string(),
    }
}

/// Representative names print with spaces between syllables on the
/// signature lines.
fn spaced_name(name: &str) -> String {
    let mut out = String::new();
    for (idx, ch) in name.chars().enumerate() {
        if idx > 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    escape_html(&out)
}

/// "2025-01-09" -> "2025년 1월 9일"; unparseable values pass through.
fn format_date_words(raw: Option<&str>) -> String {
    let Some((year, month, day)) = parse_ymd(raw) else {
        return raw.map(escape_html).unwrap_or_else(|| "-".to_string());
    };
    format!("{year}년 {month}월 {day}일")
}

/// Installation window close: one month after the contract date.
fn installation_end_words(raw: Option<&str>) -> String {
    let Some((year, month, day)) = parse_ymd(raw) else {
        return "-".to_string();
    };
    let (year, month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let day = day.min(days_in_month(year, month));
    format!("{month}월 {day}일")
}

fn parse_ymd(raw: Option<&str>) -> Option<(i32, u32, u32)> {
    let raw = raw?.trim();
    let date_part = raw.split(['T', ' ']).next()?;
    let mut parts = date_part.split('-');
    let year = parts.next()?.parse::<i32>().ok()?;
    let month = parts.next()?.parse::<u32>().ok()?;
    let day = parts.next()?.parse::<u32>().ok()?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    Some((year, month, day))
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        _ => {
            let leap = (year % 4 == 0 && year % 100 != 0) || year % 400 == 0;
            if leap { 29 } else { 28 }
        }
    }
}

fn checkbox(options: &[(&str, bool)]) -> String {
    options
        .iter()
        .map(|(label, checked)| {
            format!("{} {}", if *checked { "☑" } else { "☐" }, label)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

const CELL_LABEL: &str = "border: 1px solid #ddd; padding: 7px; background-color: #f8f9fa; \
                          font-weight: bold; vertical-align: middle; height: 35px;";
const CELL_VALUE: &str = "border: 1px solid #ddd; padding: 7px; vertical-align: middle; height: 35px;";
const SECTION_HEADING: &str = "font-size: 14px; font-weight: bold; color: #2563eb; \
                               margin: 0 0 9px 0; border-left: 3px solid #2563eb; padding-left: 7px;";

// ---------------------------------------------------------------------------
// Purchase order (발주서)
// ---------------------------------------------------------------------------

pub(crate) fn render_purchase_order_html(record: &PurchaseOrderRecord) -> String {
    let mut html = format!(
        "<div style=\"font-family: {FONT_STACK}; padding: 20px; line-height: 1.35; \
         background-color: #ffffff; color: #000000; font-size: 12px;\">\
         <div style=\"text-align: center; margin: 0 0 12px 0; border-bottom: 2px solid #2563eb; \
         padding-bottom: 10px;\">\
         <h1 style=\"font-size: 20px; font-weight: bold; margin: 0 0 6px 0; color: #1a1a1a;\">발 주 서</h1>\
         <p style=\"font-size: 12px; color: #6b7280; margin: 0;\">{}</p>\
         </div>",
        escape_html(&record.business_name)
    );

    // Managers: ours and the tax-invoice contact.
    let manager_line = {
        let mut line = format!(
            "{} | {}",
            opt(record.manager_name.as_deref()),
            opt(record.manager_contact.as_deref())
        );
        if let Some(email) = record.manager_email.as_deref() {
            if !email.is_empty() {
                line.push_str(" | ");
                line.push_str(&escape_html(email));
            }
        }
        line
    };
    let tax_line = format!(
        "{} | {} | {}",
        opt_dash(record.tax_manager_name.as_deref()),
        opt_dash(record.tax_manager_contact.as_deref()),
        opt_dash(record.tax_manager_email.as_deref())
    );
    html.push_str(&format!(
        "<div style=\"margin: 0 0 12px 0;\"><table style=\"width: 100%; border-collapse: collapse;\">\
         <tr><td colspan=\"4\" style=\"border: 1px solid #ddd; padding: 7px; background-color: #2563eb; \
         color: #ffffff; font-weight: bold; text-align: center; vertical-align: middle; height: 35px;\">담당자 정보</td></tr>\
         <tr><td style=\"{CELL_LABEL} width: 15%;\">발주 담당자</td>\
         <td style=\"{CELL_VALUE} width: 35%;\">{manager_line}</td>\
         <td style=\"{CELL_LABEL} width: 15%;\">세금계산서 담당자</td>\
         <td style=\"{CELL_VALUE} width: 35%;\">{tax_line}</td></tr></table></div>"
    ));

    // Line items: zero counts are omitted entirely.
    let items = record.equipment.line_items();
    if !items.is_empty() {
        let headers: String = items
            .iter()
            .map(|(name, _)| {
                format!(
                    "<th style=\"border: 1px solid #2563eb; padding: 7px; text-align: center; \
                     vertical-align: middle; height: 35px;\">{}</th>",
                    escape_html(name)
                )
            })
            .collect();
        let counts: String = items
            .iter()
            .map(|(_, count)| {
                format!(
                    "<td style=\"border: 1px solid #ddd; padding: 7px; text-align: center; \
                     vertical-align: middle; height: 35px;\">{count}</td>"
                )
            })
            .collect();
        html.push_str(&format!(
            "<div style=\"margin: 0 0 10px 0;\"><h2 style=\"{SECTION_HEADING}\">품목 정보</h2>\
             <table style=\"width: 100%; border-collapse: collapse;\">\
             <thead><tr style=\"background-color: #2563eb; color: #ffffff;\">\
             <th style=\"border: 1px solid #2563eb; padding: 7px; text-align: center; \
             vertical-align: middle; height: 35px;\">구분</th>{headers}</tr></thead>\
             <tbody><tr><td style=\"{CELL_LABEL} text-align: center;\">수량</td>{counts}</tr></tbody>\
             </table></div>"
        ));
    }

    html.push_str(&format!(
        "<div style=\"margin: 0 0 10px 0;\"><h2 style=\"{SECTION_HEADING}\">설치(납품) 정보</h2>\
         <table style=\"width: 100%; border-collapse: collapse;\">\
         <tr><td style=\"{CELL_LABEL} width: 20%;\">희망일자</td>\
         <td style=\"{CELL_VALUE}\">{}</td></tr></table></div>",
        opt(record.installation_desired_date.as_deref())
    ));

    html.push_str(&format!(
        "<div style=\"margin: 0 0 10px 0;\"><h2 style=\"{SECTION_HEADING}\">사업장 정보</h2>\
         <table style=\"width: 100%; border-collapse: collapse;\">\
         <tr><td style=\"{CELL_LABEL} width: 15%;\">사업장명</td><td style=\"{CELL_VALUE}\">{}</td>\
         <td style=\"{CELL_LABEL} width: 15%;\">담당자명</td><td style=\"{CELL_VALUE}\">{}</td></tr>\
         <tr><td style=\"{CELL_LABEL}\">연락처</td><td style=\"{CELL_VALUE}\">{}</td>\
         <td style=\"{CELL_LABEL}\">이메일</td><td style=\"{CELL_VALUE}\">{}</td></tr>\
         <tr><td style=\"{CELL_LABEL}\">사업장 주소</td><td style=\"{CELL_VALUE}\" colspan=\"3\">{}</td></tr>\
         <tr><td style=\"{CELL_LABEL}\">택배 주소</td><td style=\"{CELL_VALUE}\" colspan=\"3\">{}</td></tr>\
         </table></div>",
        escape_html(
            record
                .factory_name
                .as_deref()
                .filter(|v| !v.is_empty())
                .unwrap_or(&record.business_name)
        ),
        opt(record.factory_manager.as_deref()),
        opt(record.factory_contact.as_deref()),
        opt(record.factory_email.as_deref()),
        escape_html(
            record
                .factory_address
                .as_deref()
                .filter(|v| !v.is_empty())
                .unwrap_or(&record.address)
        ),
        opt(record.delivery_address.as_deref())
    ));

    // Equipment configuration checkboxes.
    let vpn = checkbox(&[
        ("유선", record.vpn_type == VpnType::Wired),
        ("무선", record.vpn_type == VpnType::Wireless),
    ]);
    let sensor_type = checkbox(&[
        (
            "프렌지타입",
            record.temperature_sensor_type == TemperatureSensorType::Flange,
        ),
        (
            "니플(소켓)타입",
            record.temperature_sensor_type == TemperatureSensorType::Nipple,
        ),
    ]);
    let sensor_length = checkbox(&[
        ("10CM", record.temperature_sensor_length == TemperatureSensorLength::Cm10),
        ("20CM", record.temperature_sensor_length == TemperatureSensorLength::Cm20),
        ("40CM", record.temperature_sensor_length == TemperatureSensorLength::Cm40),
    ]);
    let ph_indicator = checkbox(&[
        ("판넬(타공)", record.ph_indicator_location == PhIndicatorLocation::Panel),
        (
            "독립형하이박스",
            record.ph_indicator_location == PhIndicatorLocation::IndependentBox,
        ),
        (
            "해당없음",
            record.ph_indicator_location == PhIndicatorLocation::NotApplicable,
        ),
    ]);
    html.push_str(&format!(
        "<div style=\"margin: 0 0 10px 0;\"><h2 style=\"{SECTION_HEADING}\">장비 설정</h2>\
         <table style=\"width: 100%; border-collapse: collapse;\">\
         <tr><td style=\"{CELL_LABEL} width: 15%;\">VPN 설정</td><td style=\"{CELL_VALUE} width: 35%;\">{vpn}</td>\
         <td style=\"{CELL_LABEL} width: 15%;\">온도센서 타입</td><td style=\"{CELL_VALUE} width: 35%;\">{sensor_type}</td></tr>\
         <tr><td style=\"{CELL_LABEL}\">온도센서 길이</td><td style=\"{CELL_VALUE}\">{sensor_length}</td>\
         <td style=\"{CELL_LABEL}\">PH 인디게이터</td><td style=\"{CELL_VALUE}\">{ph_indicator}</td></tr>\
         </table></div>"
    ));

    // Current meter sizing table.
    html.push_str(&format!(
        "<div style=\"margin: 0 0 10px 0;\"><h2 style=\"{SECTION_HEADING}\">전류계 타입</h2>\
         <table style=\"width: 100%; border-collapse: collapse;\">\
         <thead><tr style=\"background-color: #f8f9fa;\">\
         <th style=\"border: 1px solid #ddd; padding: 7px; vertical-align: middle; height: 35px;\">구분</th>\
         <th style=\"border: 1px solid #ddd; padding: 7px; vertical-align: middle; height: 35px;\">16L</th>\
         <th style=\"border: 1px solid #ddd; padding: 7px; vertical-align: middle; height: 35px;\">24L</th>\
         <th style=\"border: 1px solid #ddd; padding: 7px; vertical-align: middle; height: 35px;\">36L</th></tr></thead>\
         <tbody><tr><td style=\"{CELL_LABEL}\">송풍+펌프 전류계</td>\
         <td style=\"{CELL_VALUE} text-align: center;\">{}</td>\
         <td style=\"{CELL_VALUE} text-align: center;\">-</td>\
         <td style=\"{CELL_VALUE} text-align: center;\">-</td></tr>\
         <tr><td style=\"{CELL_LABEL}\">배출 전류계</td>\
         <td style=\"{CELL_VALUE} text-align: center;\">{}</td>\
         <td style=\"{CELL_VALUE} text-align: center;\">{}</td>\
         <td style=\"{CELL_VALUE} text-align: center;\">{}</td></tr></tbody></table></div>",
        record.equipment.fan_ct + record.equipment.pump_ct,
        record.ct_16l,
        record.ct_24l,
        record.ct_36l
    ));

    // Amounts and payment terms.
    let terms = checkbox(&[
        (
            "선금5(발주기준)|잔금5(납품완료기준)",
            record.payment_terms == PaymentTerms::AdvanceHalf,
        ),
        ("납품 후 완납", record.payment_terms == PaymentTerms::FullAfterDelivery),
        ("기타사항(선입금)", record.payment_terms == PaymentTerms::Other),
    ]);
    html.push_str(&format!(
        "<div style=\"margin: 0 0 10px 0;\"><h2 style=\"{SECTION_HEADING}\">발주 금액 및 결제조건</h2>\
         <table style=\"width: 100%; border-collapse: collapse;\">\
         <tr><td style=\"{CELL_LABEL} width: 30%;\">공급가액</td>\
         <td style=\"{CELL_VALUE} text-align: right;\">{}원</td></tr>\
         <tr><td style=\"{CELL_LABEL}\">부가세 (10%)</td>\
         <td style=\"{CELL_VALUE} text-align: right;\">{}원</td></tr>\
         <tr style=\"background-color: #2563eb; color: #ffffff; font-weight: bold;\">\
         <td style=\"border: 1px solid #2563eb; padding: 7px; vertical-align: middle; height: 35px;\">합계</td>\
         <td style=\"border: 1px solid #2563eb; padding: 7px; text-align: right; vertical-align: middle; height: 35px;\">{}원</td></tr>\
         <tr><td style=\"{CELL_LABEL}\">결제조건</td><td style=\"{CELL_VALUE}\">{terms}<br>\
         <span style=\"font-size: 10px; color: #6b7280;\">* 세금계산서 발행 후 7일 이내</span></td></tr>\
         </table></div>",
        format_currency(record.subtotal),
        format_currency(record.vat),
        format_currency(record.grand_total)
    ));

    // Footer renders only from explicit record fields, so identical
    // records produce identical markup.
    if record.issued_at.is_some() || record.document_number.is_some() {
        html.push_str(
            "<div style=\"margin-top: 18px; padding-top: 12px; border-top: 2px solid #e5e7eb; \
             text-align: center; color: #6b7280; font-size: 10px;\">",
        );
        if let Some(issued_at) = record.issued_at.as_deref() {
            html.push_str(&format!(
                "<p style=\"margin: 3px 0;\">생성일시: {}</p>",
                escape_html(issued_at)
            ));
        }
        if let Some(number) = record.document_number.as_deref() {
            html.push_str(&format!(
                "<p style=\"margin: 3px 0;\">문서번호: {}</p>",
                escape_html(number)
            ));
        }
        html.push_str("</div>");
    }

    html.push_str("</div>");
    html
}

// ---------------------------------------------------------------------------
// Air permit (대기배출시설 허가증)
// ---------------------------------------------------------------------------

fn render_facility_rows(facilities: &[FacilityRecord], prefix: &str) -> String {
    facilities
        .iter()
        .enumerate()
        .map(|(idx, facility)| {
            let number =
                facility_display_number(prefix, idx + 1, facility.facility_number.as_deref());
            format!(
                "<tr><td style=\"border: 1px solid #ddd; padding: 6px; text-align: center; \
                 font-weight: bold;\">{}</td>\
                 <td style=\"border: 1px solid #ddd; padding: 6px;\">{}</td>\
                 <td style=\"border: 1px solid #ddd; padding: 6px; text-align: center;\">{}</td>\
                 <td style=\"border: 1px solid #ddd; padding: 6px; text-align: center;\">{}</td>\
                 <td style=\"border: 1px solid #ddd; padding: 6px; text-align: center;\">{}</td>\
                 <td style=\"border: 1px solid #ddd; padding: 6px;\">{}</td></tr>",
                escape_html(&number),
                escape_html(&facility.name),
                opt_dash(facility.capacity.as_deref()),
                facility.quantity.max(1),
                opt_dash(facility.green_link_code.as_deref()),
                opt(facility.memo.as_deref())
            )
        })
        .collect()
}

fn render_facility_table(title: &str, accent: &str, tint: &str, rows: String) -> String {
    format!(
        "<div style=\"margin: 0 0 15px 0;\">\
         <h4 style=\"font-size: 12px; font-weight: bold; color: {accent}; margin: 0 0 8px 0; \
         padding: 6px; background-color: {tint}; border-left: 3px solid {accent};\">{title}</h4>\
         <table style=\"width: 100%; border-collapse: collapse; font-size: 11px;\">\
         <thead><tr style=\"background-color: #f8f9fa;\">\
         <th style=\"border: 1px solid #ddd; padding: 6px; text-align: center; width: 10%;\">시설번호</th>\
         <th style=\"border: 1px solid #ddd; padding: 6px; text-align: center; width: 28%;\">시설명</th>\
         <th style=\"border: 1px solid #ddd; padding: 6px; text-align: center; width: 17%;\">용량</th>\
         <th style=\"border: 1px solid #ddd; padding: 6px; text-align: center; width: 8%;\">수량</th>\
         <th style=\"border: 1px solid #ddd; padding: 6px; text-align: center; width: 17%;\">그린링크</th>\
         <th style=\"border: 1px solid #ddd; padding: 6px; text-align: center; width: 20%;\">메모</th></tr></thead>\
         <tbody>{rows}</tbody></table></div>"
    )
}

fn render_outlet_html(outlet: &OutletRecord) -> String {
    let mut html = format!(
        "<div style=\"margin: 0 0 20px 0; border: 1px solid #e5e7eb; background-color: #ffffff;\">\
         <div style=\"background-color: #f3f4f6; padding: 12px; border-bottom: 1px solid #e5e7eb;\">\
         <h3 style=\"margin: 0; font-size: 13px; font-weight: bold; color: #374151;\">{} (배출구 #{})</h3>\
         </div><div style=\"padding: 15px;\">",
        escape_html(&outlet.outlet_name),
        outlet.outlet_number
    );
    if !outlet.discharge_facilities.is_empty() {
        html.push_str(&render_facility_table(
            "배출시설",
            "#dc2626",
            "#fef2f2",
            render_facility_rows(&outlet.discharge_facilities, "배"),
        ));
    }
    if !outlet.prevention_facilities.is_empty() {
        html.push_str(&render_facility_table(
            "방지시설",
            "#059669",
            "#f0fdf4",
            render_facility_rows(&outlet.prevention_facilities, "방"),
        ));
    }
    html.push_str("</div></div>");
    html
}

pub(crate) fn render_air_permit_html(record: &AirPermitRecord) -> String {
    let mut html = format!(
        "<div style=\"font-family: {FONT_STACK}; padding: 20px; line-height: 1.6; \
         background-color: #ffffff; color: #000000; font-size: 12px;\">\
         <div style=\"text-align: center; margin: 0 0 20px 0; border-bottom: 2px solid #2563eb; \
         padding-bottom: 10px;\">\
         <h1 style=\"font-size: 20px; font-weight: bold; margin: 0 0 6px 0; color: #1a1a1a;\">대기배출시설 허가증</h1>\
         <p style=\"font-size: 12px; color: #6b7280; margin: 0;\">{}</p></div>",
        escape_html(&record.business_name)
    );

    html.push_str(&format!(
        "<div style=\"margin: 0 0 15px 0;\"><h2 style=\"{SECTION_HEADING}\">기본 정보</h2>\
         <table style=\"width: 100%; border-collapse: collapse; font-size: 12px;\">\
         <tr><td style=\"{CELL_LABEL} width: 15%;\">사업장명</td><td style=\"{CELL_VALUE} width: 35%;\">{}</td>\
         <td style=\"{CELL_LABEL} width: 15%;\">지자체</td><td style=\"{CELL_VALUE} width: 35%;\">{}</td></tr>\
         <tr><td style=\"{CELL_LABEL}\">업종</td><td style=\"{CELL_VALUE}\">{}</td>\
         <td style=\"{CELL_LABEL}\">종별</td><td style=\"{CELL_VALUE}\">{}</td></tr>\
         <tr><td style=\"{CELL_LABEL}\">시설번호</td><td style=\"{CELL_VALUE}\">{}</td>\
         <td style=\"{CELL_LABEL}\">그린링크코드</td><td style=\"{CELL_VALUE}\">{}</td></tr>\
         <tr><td style=\"{CELL_LABEL}\">최초신고일</td><td style=\"{CELL_VALUE}\">{}</td>\
         <td style=\"{CELL_LABEL}\">가동개시일</td><td style=\"{CELL_VALUE}\">{}</td></tr>\
         </table></div>",
        escape_html(&record.business_name),
        opt_dash(record.local_government.as_deref()),
        opt_dash(record.business_type.as_deref()),
        opt_dash(record.category.as_deref()),
        opt_dash(record.facility_number.as_deref()),
        opt_dash(record.green_link_code.as_deref()),
        format_date(record.first_report_date.as_deref()),
        format_date(record.operation_start_date.as_deref())
    ));

    if !record.outlets.is_empty() {
        html.push_str(&format!(
            "<div style=\"margin: 0 0 15px 0;\"><h2 style=\"{SECTION_HEADING}\">배출구별 시설 정보</h2>"
        ));
        for outlet in &record.outlets {
            html.push_str(&render_outlet_html(outlet));
        }
        html.push_str("</div>");
    }

    if let Some(memo) = record.memo.as_deref() {
        if !memo.trim().is_empty() {
            html.push_str(&format!(
                "<div style=\"margin: 0 0 15px 0;\"><h2 style=\"{SECTION_HEADING}\">메모</h2>\
                 <div style=\"border: 1px solid #ddd; padding: 15px; background-color: #fafafa;\">{}</div></div>",
                escape_multiline(memo)
            ));
        }
    }

    if record.issued_at.is_some() || record.permit_id.is_some() {
        html.push_str(
            "<div style=\"margin-top: 20px; padding-top: 12px; border-top: 2px solid #e5e7eb; \
             text-align: center; color: #6b7280; font-size: 10px;\">",
        );
        if let Some(issued_at) = record.issued_at.as_deref() {
            html.push_str(&format!(
                "<p style=\"margin: 3px 0;\">생성일시: {}</p>",
                escape_html(issued_at)
            ));
        }
        if let Some(permit_id) = record.permit_id.as_deref() {
            html.push_str(&format!(
                "<p style=\"margin: 3px 0;\">대기필증 ID: {}</p>",
                escape_html(permit_id)
            ));
        }
        html.push_str("</div>");
    }

    html.push_str("</div>");
    html
}

// ---------------------------------------------------------------------------
// Contract (공급계약서), three fixed pages scaled onto one sheet each
// ---------------------------------------------------------------------------

const PARTY_LABEL: &str = "border: 1px solid #000000; padding: 8px 12px; \
                           background-color: #f9fafb; width: 22%; vertical-align: middle;";
const PARTY_VALUE: &str = "border: 1px solid #000000; padding: 8px 12px; vertical-align: middle;";

fn party_rows(rows: &[(&str, String)]) -> String {
    rows.iter()
        .map(|(label, value)| {
            format!(
                "<tr><td style=\"{PARTY_LABEL}\">{label}</td>\
                 <td style=\"{PARTY_VALUE}\">{value}</td></tr>"
            )
        })
        .collect()
}

pub(crate) fn render_contract_cover_html(record: &ContractRecord) -> String {
    let buyer = party_rows(&[
        ("상호", escape_html(&record.business_name)),
        ("주소", escape_html(&record.business_address)),
        ("성명", spaced_name(&record.business_representative)),
        (
            "사업자등록번호",
            opt_dash(record.business_registration_number.as_deref()),
        ),
        ("전화번호", opt_dash(record.business_phone.as_deref())),
        ("팩스번호", opt_dash(record.business_fax.as_deref())),
    ]);
    let supplier = party_rows(&[
        ("상호", escape_html(&record.supplier_company_name)),
        ("주소", escape_html(&record.supplier_address)),
        ("성명", spaced_name(&record.supplier_representative)),
        (
            "사업자등록번호",
            opt_dash(record.supplier_registration_number.as_deref()),
        ),
        ("전화번호", opt_dash(record.supplier_phone.as_deref())),
        ("팩스번호", opt_dash(record.supplier_fax.as_deref())),
    ]);

    format!(
        "<div style=\"font-family: {FONT_STACK}; padding: 20px; line-height: 1.5; \
         background-color: #ffffff; color: #000000; font-size: 12px;\">\
         <table style=\"width: 100%; border-collapse: collapse; border: 2px solid #000000;\">\
         <tr><td colspan=\"2\" style=\"border: 1px solid #000000; padding: 16px; text-align: center;\">\
         <h1 style=\"font-size: 24px; font-weight: bold; margin: 0;\">공 급 계 약 서</h1></td></tr>\
         <tr><td colspan=\"2\" style=\"border: 1px solid #000000; padding: 6px 12px; \
         background-color: #f3f4f6; font-weight: bold; text-align: center;\">갑 (수요자)</td></tr>\
         {buyer}\
         <tr><td colspan=\"2\" style=\"border: 1px solid #000000; padding: 6px 12px; \
         background-color: #f3f4f6; font-weight: bold; text-align: center;\">을 (공급자)</td></tr>\
         {supplier}\
         </table>\
         <table style=\"width: 100%; border-collapse: collapse; border: 2px solid #000000; margin-top: 0;\">\
         <tr><td style=\"border: 1px solid #000000; padding: 12px 16px;\">\
         <p style=\"margin: 0 0 8px 0;\">1. 무선통신 1기 적용조건(KT 5년 약정, 14,000원 부가세 별도)</p>\
         <p style=\"margin: 0 0 8px 0;\">2. 선금 {advance}%(<span style=\"color: #dc2626;\">입금 확인 후 발주 진행</span>), 부착완료 후 {balance}%</p>\
         <p style=\"margin: 0 0 8px 0;\">3. 부착완료신고서 및 그린링크 전송확인서는 설치완료(<span style=\"color: #dc2626;\">입금 확인 후</span>) 7일 이내 제출</p>\
         <p style=\"margin: 16px 0 0 0; text-align: right; font-size: 13px;\">{date}</p>\
         </td></tr></table>\
         <table style=\"width: 100%; border-collapse: collapse; border: 2px solid #000000;\">\
         <tr><td style=\"border: 1px solid #000000; width: 10%; text-align: center; padding: 16px 0; font-weight: bold;\">&quot;갑&quot;</td>\
         <td style=\"border: 1px solid #000000; width: 40%; text-align: center; padding: 16px 0; font-weight: bold;\">{buyer_name}</td>\
         <td style=\"border: 1px solid #000000; width: 10%; text-align: center; padding: 16px 0; font-weight: bold;\">&quot;을&quot;</td>\
         <td style=\"border: 1px solid #000000; width: 40%; text-align: center; padding: 16px 0; font-weight: bold;\">{supplier_name}</td></tr>\
         <tr><td style=\"border: 1px solid #000000; text-align: center; padding: 24px 0; font-weight: bold;\">성명</td>\
         <td style=\"border: 1px solid #000000; text-align: center; padding: 24px 0;\">\
         <span style=\"font-size: 15px;\">{buyer_rep}</span> (인)</td>\
         <td style=\"border: 1px solid #000000; text-align: center; padding: 24px 0; font-weight: bold;\">성명</td>\
         <td style=\"border: 1px solid #000000; text-align: center; padding: 24px 0;\">\
         <span style=\"font-size: 15px;\">{supplier_rep}</span> <span style=\"color: #dc2626;\">(인)</span></td></tr>\
         </table></div>",
        advance = record.advance_ratio(),
        balance = record.balance_ratio(),
        date = format_date_words(record.contract_date.as_deref()),
        buyer_name = escape_html(&record.business_name),
        supplier_name = escape_html(&record.supplier_company_name),
        buyer_rep = spaced_name(&record.business_representative),
        supplier_rep = spaced_name(&record.supplier_representative),
    )
}

pub(crate) fn render_contract_terms_html(record: &ContractRecord) -> String {
    let equipment = &record.equipment;
    let clause_heading = "font-size: 15px; font-weight: bold; margin: 0 0 8px 0;";
    let clause_body = "font-size: 12px; margin: 0 0 6px 0; padding-left: 14px;";
    let amount_cell = "border: 1px solid #000000; padding: 6px; text-align: center; font-size: 11px;";

    format!(
        "<div style=\"font-family: {FONT_STACK}; padding: 20px; line-height: 1.6; \
         background-color: #ffffff; color: #000000; font-size: 12px;\">\
         <h1 style=\"font-size: 22px; font-weight: bold; text-align: center; margin: 0 0 24px 0;\">공급계약서</h1>\
         <p style=\"margin: 0 0 24px 0; font-size: 13px;\"><b>{buyer}</b> (이하 &quot;갑&quot;이라 함) 과 \
         <b>{supplier}</b>(이하 &quot;을&quot;이라 함)은 제품 설치 계약을 상호 이익 존중 및 신의 성실의 \
         원칙에 따라 다음과 같이 이행한다.</p>\
         <div style=\"margin: 0 0 18px 0;\"><h2 style=\"{clause_heading}\">제 1조 ( 목적 )</h2>\
         <p style=\"{clause_body}\">1. &quot;갑&quot;이 구매를 의뢰하여 &quot;을&quot;이 제작하여 &quot;갑&quot;에게 \
         설치 공급하고 상호 협조를 통하여 하기의 본 계약사항 같이 성실히 준수하여, 상호 회사의 이익과 \
         발전에 이바지함을 목적으로 한다.</p></div>\
         <div style=\"margin: 0 0 18px 0;\"><h2 style=\"{clause_heading}\">제 2조 ( 계약 내용 및 납품 설치기간 )</h2>\
         <p style=\"{clause_body}\">1. &quot;을&quot;은 &quot;갑&quot;이 의뢰한 방지시설 IoT 설비의 납품 및 제작 설치를 수행한다.</p>\
         <p style=\"{clause_body}\">2. 설치는 {start}부터 {end}까지 하며, 구체 일정은 쌍방의 협의에 맞게 협의한다.</p></div>\
         <div style=\"margin: 0 0 18px 0;\"><h2 style=\"{clause_heading}\">제 3조 ( 금액 )</h2>\
         <p style=\"{clause_body}\">IoT 장비 설치관련 총 금액은 <span style=\"color: #dc2626; font-weight: bold;\">₩{final_amount}</span> \
         (일금 {final_korean}원)으로 다음과 같다.<span style=\"color: #dc2626;\">(VAT 별도)</span></p>\
         <table style=\"width: 100%; border-collapse: collapse; border: 1px solid #000000; margin: 0 0 6px 0;\">\
         <thead><tr style=\"background-color: #f3f4f6;\">\
         <th style=\"{amount_cell}\">IoT 구성</th><th style=\"{amount_cell}\">PH계</th>\
         <th style=\"{amount_cell}\">차압계</th><th style=\"{amount_cell}\">온도계</th>\
         <th style=\"{amount_cell}\">배출전류계</th><th style=\"{amount_cell}\">송풍전류계+펌프전류계</th>\
         <th style=\"{amount_cell}\">게이트웨이</th><th style=\"{amount_cell}\">VPN</th>\
         <th style=\"{amount_cell}\">금액 계</th></tr></thead>\
         <tbody><tr>\
         <td style=\"{amount_cell}\">수량</td><td style=\"{amount_cell}\">{ph}</td>\
         <td style=\"{amount_cell}\">{dp}</td><td style=\"{amount_cell}\">{temp}</td>\
         <td style=\"{amount_cell}\">{discharge}</td><td style=\"{amount_cell}\">{fan_pump}</td>\
         <td style=\"{amount_cell}\">{gateway}</td><td style=\"{amount_cell}\">{vpn}</td>\
         <td style=\"{amount_cell} color: #dc2626; font-weight: bold;\">₩{total}</td></tr>\
         <tr><td colspan=\"8\" style=\"{amount_cell} text-align: left;\">추가공사비</td>\
         <td style=\"{amount_cell}\">₩{additional}</td></tr>\
         <tr><td colspan=\"8\" style=\"{amount_cell} text-align: left;\">협의사항(네고)</td>\
         <td style=\"{amount_cell}\">₩{negotiation}</td></tr>\
         </tbody></table></div>\
         <div style=\"margin: 0 0 18px 0;\"><h2 style=\"{clause_heading}\">제 4조 ( 대금 결제 )</h2>\
         <p style=\"{clause_body}\">1. &quot;갑&quot;은 &quot;을&quot;에게 발주 시 \
         <span style=\"color: #dc2626; font-weight: bold;\">₩{advance}</span> 지급하고, 부착완료 후 잔금 \
         <span style=\"color: #dc2626; font-weight: bold;\">₩{balance}</span> 을 7일 이내 지급한다. \
         <span style=\"color: #dc2626;\">(VAT 별도)</span></p>\
         {bank_line}\
         <p style=\"{clause_body}\">2. &quot;을&quot;은 설치 완료(입금확인 후)일로부터 7일 이내에 아래 보고서류를 \
         &quot;갑&quot;에게 제출한다.</p></div>\
         </div>",
        buyer = escape_html(&record.business_name),
        supplier = escape_html(&record.supplier_company_name),
        start = format_date_words(record.contract_date.as_deref()),
        end = installation_end_words(record.contract_date.as_deref()),
        final_amount = format_currency(record.final_amount()),
        final_korean = format_amount_korean(record.final_amount()),
        ph = equipment.ph_sensor,
        dp = equipment.differential_pressure_meter,
        temp = equipment.temperature_meter,
        discharge = equipment.discharge_ct,
        fan_pump = equipment.fan_ct + equipment.pump_ct,
        gateway = equipment.gateway,
        vpn = equipment.vpn_router_wired + equipment.vpn_router_wireless,
        total = format_currency(record.total_amount),
        additional = format_currency(record.additional_cost.unwrap_or(0)),
        negotiation = format_currency(record.negotiation_cost.unwrap_or(0)),
        advance = format_currency(record.advance_amount()),
        balance = format_currency(record.balance_amount()),
        bank_line = match record.supplier_bank_account.as_deref() {
            Some(account) if !account.trim().is_empty() => format!(
                "<p style=\"color: #2563eb; font-weight: bold; margin: 0 0 6px 0; padding-left: 14px;\">[{} {}]</p>",
                escape_html(account),
                escape_html(&record.supplier_company_name)
            ),
            _ => String::new(),
        },
    )
}

pub(crate) fn render_contract_closing_html(record: &ContractRecord) -> String {
    let clause_heading = "font-size: 15px; font-weight: bold; margin: 0 0 8px 0;";
    let clause_body = "font-size: 12px; margin: 0 0 6px 0; padding-left: 14px;";
    format!(
        "<div style=\"font-family: {FONT_STACK}; padding: 20px; line-height: 1.6; \
         background-color: #ffffff; color: #000000; font-size: 12px;\">\
         <div style=\"margin: 0 0 18px 0; padding-left: 28px;\">\
         <p style=\"margin: 0 0 4px 0;\">(1) 신호기기 부착완료 신고서</p>\
         <p style=\"margin: 0 0 4px 0;\">(2) 그린링크 전송확인서</p></div>\
         <div style=\"margin: 0 0 18px 0;\"><h2 style=\"{clause_heading}\">제 5조 ( 하자 보증 )</h2>\
         <p style=\"{clause_body}\">1. 무상하자 보증 기간은 납품일로부터 24개월로 정한다.</p>\
         <p style=\"{clause_body}\">2. 보증기간 내에 발생되는 하자에 대하여 수리 및 교환을 하며, 사용상 부주의 및 \
         &quot;갑&quot;의 책임에 의한 하자, 천재지변은 유상 수리한다.</p></div>\
         <div style=\"margin: 0 0 18px 0;\"><h2 style=\"{clause_heading}\">제 6조 ( 권리 의무사항 )</h2>\
         <p style=\"{clause_body}\">1. 본 계약의 이행에 의한 성과물의 소유권은 &quot;갑&quot;에게 귀속된다.</p></div>\
         <div style=\"margin: 0 0 18px 0;\"><h2 style=\"{clause_heading}\">제 7조 ( 계약 해지 )</h2>\
         <p style=\"{clause_body}\">&quot;갑&quot; 또는 &quot;을&quot;은 상대방이 다음의 각 항목 중 하나에 해당할 때에는 \
         어떤 최고통지를 하지 않고 곧바로 본 계약을 해지할 수 있다.</p>\
         <p style=\"{clause_body} padding-left: 28px;\">1. 파산, 화의 또는 회사정리의 신청을 하거나 이들의 신청이 이루어졌을 때</p>\
         <p style=\"{clause_body} padding-left: 28px;\">2. 타회사의 합병 등의 사유로 물품 대금을 결제할 수 없을 때</p></div>\
         <div style=\"margin: 0 0 18px 0;\"><h2 style=\"{clause_heading}\">제 8조 ( 계약 유효 기간 )</h2>\
         <p style=\"{clause_body}\">1. 본 계약의 유효기간은 계약 체결일로부터 12개월로 한다.</p></div>\
         <div style=\"margin: 0 0 18px 0;\"><h2 style=\"{clause_heading}\">제 9조 ( 기타 사항 )</h2>\
         <p style=\"{clause_body}\">1. 본 계약상에 명시되지 않은 사항 또는 계약 조항 해석에 이의가 있을 때는 \
         &quot;갑&quot;과 &quot;을&quot;이 협의하여 결정하고 협의가 이루어지지 않을 때는 일반 관례에 따른다.</p></div>\
         <div style=\"margin: 24px 0 0 0;\">\
         <p style=\"margin: 0 0 4px 0;\">본 계약을 확정하기 위하여 2부를 작성 상호 날인하여 날인 시점을 확정 시점으로 \
         하고, 이를 각 1부씩 보관한다.</p>\
         <p style=\"margin: 16px 0 0 0; text-align: right; font-size: 13px;\">{date}</p></div>\
         </div>",
        date = format_date_words(record.contract_date.as_deref()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::EquipmentCounts;

    fn po_record() -> PurchaseOrderRecord {
        PurchaseOrderRecord {
            business_name: "한국환경산업".to_string(),
            address: "서울특별시 강남구".to_string(),
            equipment: EquipmentCounts {
                ph_sensor: 3,
                gateway: 1,
                ..EquipmentCounts::default()
            },
            subtotal: 5_000_000,
            vat: 500_000,
            grand_total: 5_500_000,
            ..PurchaseOrderRecord::default()
        }
    }

    #[test]
    fn purchase_order_table_has_exactly_the_nonzero_items() {
        let html = render_purchase_order_html(&po_record());
        assert!(html.contains("PH센서"));
        assert!(html.contains("게이트웨이"));
        assert!(!html.contains("차압계"));
        assert!(!html.contains("온도계"));
        assert!(!html.contains(">전류계<"));
        assert!(!html.contains("VPN(유선)"));
        assert!(!html.contains("확장디바이스"));
        // item table: 구분 + 2 items; current-meter table contributes 4 more.
        assert_eq!(html.matches("<th").count(), 7);
    }

    #[test]
    fn purchase_order_with_all_optionals_absent_still_renders() {
        let record = PurchaseOrderRecord {
            business_name: "사업장".to_string(),
            ..PurchaseOrderRecord::default()
        };
        let html = render_purchase_order_html(&record);
        assert!(!html.is_empty());
        assert!(html.contains("발 주 서"));
        assert!(html.contains("사업장"));
        assert!(html.contains("희망일자"));
        assert!(!html.contains("생성일시"));
        assert!(!html.contains("문서번호"));
    }

    #[test]
    fn rendering_is_idempotent_without_clock_fields() {
        let record = po_record();
        assert_eq!(
            render_purchase_order_html(&record),
            render_purchase_order_html(&record)
        );
        let contract = ContractRecord {
            business_name: "갑사".to_string(),
            supplier_company_name: "을사".to_string(),
            total_amount: 1_000_000,
            ..ContractRecord::default()
        };
        assert_eq!(
            render_contract_terms_html(&contract),
            render_contract_terms_html(&contract)
        );
    }

    #[test]
    fn markup_significant_input_is_escaped_everywhere() {
        let mut record = po_record();
        record.business_name = "<img src=x onerror=alert(1)>&Co".to_string();
        record.manager_name = Some("\"quoted\" <b>name</b>".to_string());
        let html = render_purchase_order_html(&record);
        assert!(!html.contains("<img src=x"));
        assert!(!html.contains("<b>name</b>"));
        assert!(html.contains("&lt;img src=x onerror=alert(1)&gt;&amp;Co"));
        assert!(html.contains("&quot;quoted&quot; &lt;b&gt;name&lt;/b&gt;"));
    }

    #[test]
    fn contract_payment_clause_uses_rounded_split_amounts() {
        let record = ContractRecord {
            business_name: "갑사".to_string(),
            supplier_company_name: "을사".to_string(),
            final_amount: Some(1_000_000),
            payment_advance_ratio: Some(60),
            ..ContractRecord::default()
        };
        let html = render_contract_terms_html(&record);
        assert!(html.contains("₩600,000"));
        assert!(html.contains("₩400,000"));
        let cover = render_contract_cover_html(&record);
        assert!(cover.contains("선금 60%"));
        assert!(cover.contains("부착완료 후 40%"));
    }

    #[test]
    fn contract_amount_in_words_matches_total() {
        let record = ContractRecord {
            business_name: "갑".to_string(),
            supplier_company_name: "을".to_string(),
            total_amount: 5_500_000,
            ..ContractRecord::default()
        };
        let html = render_contract_terms_html(&record);
        assert!(html.contains("일금 오백오십만원"));
    }

    #[test]
    fn contract_installation_window_spans_one_month() {
        let record = ContractRecord {
            contract_date: Some("2025-12-15".to_string()),
            ..ContractRecord::default()
        };
        let html = render_contract_terms_html(&record);
        assert!(html.contains("2025년 12월 15일부터"));
        assert!(html.contains("1월 15일까지"));
    }

    #[test]
    fn air_permit_lists_outlets_with_positional_numbers() {
        let record = AirPermitRecord {
            business_name: "사업장".to_string(),
            outlets: vec![OutletRecord {
                outlet_number: 1,
                outlet_name: "1번 배출구".to_string(),
                discharge_facilities: vec![FacilityRecord {
                    name: "혼합시설".to_string(),
                    capacity: Some("3.5㎥".to_string()),
                    quantity: 2,
                    ..FacilityRecord::default()
                }],
                prevention_facilities: vec![FacilityRecord {
                    name: "흡착에의한시설".to_string(),
                    capacity: Some("250㎥/분".to_string()),
                    quantity: 1,
                    facility_number: Some("P-1".to_string()),
                    ..FacilityRecord::default()
                }],
            }],
            ..AirPermitRecord::default()
        };
        let html = render_air_permit_html(&record);
        assert!(html.contains("1번 배출구 (배출구 #1)"));
        assert!(html.contains("배1"));
        assert!(html.contains("방1 (P-1)"));
        assert!(html.contains("250㎥/분"));
        assert!(html.contains("배출시설"));
        assert!(html.contains("방지시설"));
    }

    #[test]
    fn air_permit_memo_keeps_line_breaks() {
        let record = AirPermitRecord {
            business_name: "사업장".to_string(),
            memo: Some("첫 줄\n둘째 줄".to_string()),
            ..AirPermitRecord::default()
        };
        let html = render_air_permit_html(&record);
        assert!(html.contains("첫 줄<br>둘째 줄"));
    }

    #[test]
    fn purchase_order_section_appends_permit_as_second_capture() {
        let mut record = po_record();
        assert_eq!(Section::PurchaseOrder(record.clone()).render().len(), 1);
        record.air_permit = Some(AirPermitRecord {
            business_name: record.business_name.clone(),
            ..AirPermitRecord::default()
        });
        let rendered = Section::PurchaseOrder(record).render();
        assert_eq!(rendered.len(), 2);
        assert!(rendered.iter().all(|r| r.fill == PageFill::Flow));
        assert!(rendered[1].html.contains("대기배출시설 허가증"));
    }

    #[test]
    fn contract_section_renders_three_single_fit_pages() {
        let record = ContractRecord::default();
        let rendered = Section::Contract(record).render();
        assert_eq!(rendered.len(), 3);
        assert!(rendered.iter().all(|r| r.fill == PageFill::FitSingle));
    }

    #[test]
    fn section_codes_resolve_in_the_catalog() {
        let po = Section::PurchaseOrder(PurchaseOrderRecord::default());
        assert_eq!(po.doc_code(), "purchase_order");
        assert_eq!(po.title(), "발주서");
        let contract = Section::Contract(ContractRecord::default());
        assert!(docpress_catalog_contract::doc_type(contract.doc_code()).is_some());
    }
}
