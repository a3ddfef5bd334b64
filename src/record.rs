//! Plain data records handed to the template renderer. Records are
//! single-call inputs: built by the caller immediately before an export
//! and discarded after. Missing optional fields never fail a render;
//! they degrade to an empty placeholder or a default.

/// Installed-equipment counts shared by purchase orders and contracts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EquipmentCounts {
    pub ph_sensor: u32,
    pub differential_pressure_meter: u32,
    pub temperature_meter: u32,
    pub discharge_ct: u32,
    pub fan_ct: u32,
    pub pump_ct: u32,
    pub gateway: u32,
    pub vpn_router_wired: u32,
    pub vpn_router_wireless: u32,
    pub expansion_device: u32,
}

impl EquipmentCounts {
    /// The three current meters are ordered as one merged 전류계 line item.
    pub fn total_ct(&self) -> u32 {
        self.discharge_ct + self.fan_ct + self.pump_ct
    }

    /// Line items for the order table, zero counts omitted.
    pub fn line_items(&self) -> Vec<(&'static str, u32)> {
        [
            ("PH센서", self.ph_sensor),
            ("차압계", self.differential_pressure_meter),
            ("온도계", self.temperature_meter),
            ("전류계", self.total_ct()),
            ("게이트웨이", self.gateway),
            ("VPN(유선)", self.vpn_router_wired),
            ("VPN(무선)", self.vpn_router_wireless),
            ("확장디바이스", self.expansion_device),
        ]
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VpnType {
    Wired,
    #[default]
    Wireless,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TemperatureSensorType {
    #[default]
    Flange,
    Nipple,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TemperatureSensorLength {
    #[default]
    Cm10,
    Cm20,
    Cm40,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PhIndicatorLocation {
    Panel,
    #[default]
    IndependentBox,
    NotApplicable,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PaymentTerms {
    /// 선금 5 on order, 잔금 5 on delivery.
    #[default]
    AdvanceHalf,
    FullAfterDelivery,
    Other,
}

/// Purchase order (발주서) toward an equipment manufacturer.
#[derive(Debug, Clone, Default)]
pub struct PurchaseOrderRecord {
    pub business_name: String,
    pub document_number: Option<String>,
    pub manager_name: Option<String>,
    pub manager_contact: Option<String>,
    pub manager_email: Option<String>,
    pub tax_manager_name: Option<String>,
    pub tax_manager_contact: Option<String>,
    pub tax_manager_email: Option<String>,
    pub address: String,
    pub factory_name: Option<String>,
    pub factory_manager: Option<String>,
    pub factory_contact: Option<String>,
    pub factory_email: Option<String>,
    pub factory_address: Option<String>,
    pub delivery_address: Option<String>,
    pub installation_desired_date: Option<String>,
    pub equipment: EquipmentCounts,
    pub ct_16l: u32,
    pub ct_24l: u32,
    pub ct_36l: u32,
    pub vpn_type: VpnType,
    pub temperature_sensor_type: TemperatureSensorType,
    pub temperature_sensor_length: TemperatureSensorLength,
    pub ph_indicator_location: PhIndicatorLocation,
    pub payment_terms: PaymentTerms,
    pub subtotal: i64,
    pub vat: i64,
    pub grand_total: i64,
    /// Display timestamp for the footer. Left out, the footer line is
    /// omitted and rendering the same record twice is byte-identical.
    pub issued_at: Option<String>,
    /// When present, the permit renders as an appendix section on a
    /// fresh page after the order body.
    pub air_permit: Option<AirPermitRecord>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContractKind {
    Subsidy,
    #[default]
    SelfPay,
}

impl ContractKind {
    pub fn doc_code(&self) -> &'static str {
        match self {
            ContractKind::Subsidy => "contract_subsidy",
            ContractKind::SelfPay => "contract_self_pay",
        }
    }
}

/// IoT equipment installation contract.
#[derive(Debug, Clone, Default)]
pub struct ContractRecord {
    pub contract_number: String,
    pub contract_date: Option<String>,
    pub kind: ContractKind,
    pub business_name: String,
    pub business_address: String,
    pub business_representative: String,
    pub business_registration_number: Option<String>,
    pub business_phone: Option<String>,
    pub business_fax: Option<String>,
    pub total_amount: i64,
    pub additional_cost: Option<i64>,
    pub negotiation_cost: Option<i64>,
    /// Settled amount; falls back to `total_amount` when absent.
    pub final_amount: Option<i64>,
    pub supplier_company_name: String,
    pub supplier_representative: String,
    pub supplier_address: String,
    pub supplier_registration_number: Option<String>,
    pub supplier_phone: Option<String>,
    pub supplier_fax: Option<String>,
    /// Shown in the payment clause, e.g. "기업은행 000-000000-00-000".
    pub supplier_bank_account: Option<String>,
    /// Advance share in percent; defaults to 50.
    pub payment_advance_ratio: Option<u32>,
    /// Balance share in percent; defaults to the advance complement.
    pub payment_balance_ratio: Option<u32>,
    pub equipment: EquipmentCounts,
    pub issued_at: Option<String>,
}

impl ContractRecord {
    pub fn final_amount(&self) -> i64 {
        self.final_amount.unwrap_or(self.total_amount)
    }

    pub fn advance_ratio(&self) -> u32 {
        self.payment_advance_ratio.unwrap_or(50).min(100)
    }

    pub fn balance_ratio(&self) -> u32 {
        self.payment_balance_ratio
            .unwrap_or_else(|| 100 - self.advance_ratio())
            .min(100)
    }

    /// Each share is rounded to the nearest whole won independently, so
    /// the two shares may drift from the total by one unit. Observed
    /// billing behavior, kept as-is.
    pub fn advance_amount(&self) -> i64 {
        round_share(self.final_amount(), self.advance_ratio())
    }

    pub fn balance_amount(&self) -> i64 {
        round_share(self.final_amount(), self.balance_ratio())
    }
}

fn round_share(amount: i64, ratio: u32) -> i64 {
    let scaled = amount as i128 * ratio as i128;
    let adj = if scaled >= 0 { 50 } else { -50 };
    ((scaled + adj) / 100) as i64
}

/// Air-emission permit document (대기배출시설 허가증).
#[derive(Debug, Clone, Default)]
pub struct AirPermitRecord {
    pub permit_id: Option<String>,
    pub business_name: String,
    pub local_government: Option<String>,
    pub business_type: Option<String>,
    /// 종별 (category class).
    pub category: Option<String>,
    pub facility_number: Option<String>,
    pub green_link_code: Option<String>,
    pub memo: Option<String>,
    pub first_report_date: Option<String>,
    pub operation_start_date: Option<String>,
    pub outlets: Vec<OutletRecord>,
    pub issued_at: Option<String>,
}

/// One discharge outlet with its discharge and prevention facilities.
#[derive(Debug, Clone, Default)]
pub struct OutletRecord {
    pub outlet_number: u32,
    pub outlet_name: String,
    pub discharge_facilities: Vec<FacilityRecord>,
    pub prevention_facilities: Vec<FacilityRecord>,
}

#[derive(Debug, Clone, Default)]
pub struct FacilityRecord {
    pub name: String,
    pub capacity: Option<String>,
    pub quantity: u32,
    /// User-entered facility number, shown next to the positional
    /// default (배1, 방2, ...).
    pub facility_number: Option<String>,
    pub green_link_code: Option<String>,
    pub memo: Option<String>,
}

/// Positional facility label: 배N for discharge rows, 방N for prevention
/// rows, with a user-entered number appended in parentheses.
pub fn facility_display_number(
    prefix: &str,
    position: usize,
    user_number: Option<&str>,
) -> String {
    let default = format!("{prefix}{position}");
    match user_number {
        Some(user) if !user.trim().is_empty() => format!("{default} ({})", user.trim()),
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_items_omit_zero_counts_and_merge_current_meters() {
        let equipment = EquipmentCounts {
            ph_sensor: 3,
            gateway: 1,
            ..EquipmentCounts::default()
        };
        let items = equipment.line_items();
        assert_eq!(items, vec![("PH센서", 3), ("게이트웨이", 1)]);

        let meters = EquipmentCounts {
            discharge_ct: 2,
            fan_ct: 1,
            pump_ct: 1,
            ..EquipmentCounts::default()
        };
        assert_eq!(meters.line_items(), vec![("전류계", 4)]);
    }

    #[test]
    fn split_payment_rounds_each_share_independently() {
        let record = ContractRecord {
            final_amount: Some(1_000_000),
            payment_advance_ratio: Some(60),
            ..ContractRecord::default()
        };
        assert_eq!(record.advance_amount(), 600_000);
        assert_eq!(record.balance_amount(), 400_000);
    }

    #[test]
    fn split_payment_defaults_to_even_halves() {
        let record = ContractRecord {
            total_amount: 333_333,
            ..ContractRecord::default()
        };
        assert_eq!(record.advance_ratio(), 50);
        assert_eq!(record.balance_ratio(), 50);
        // Independent rounding: shares sum one unit above the total.
        assert_eq!(record.advance_amount(), 166_667);
        assert_eq!(record.balance_amount(), 166_667);
    }

    #[test]
    fn balance_ratio_complements_explicit_advance() {
        let record = ContractRecord {
            payment_advance_ratio: Some(70),
            ..ContractRecord::default()
        };
        assert_eq!(record.balance_ratio(), 30);
    }

    #[test]
    fn facility_numbers_combine_default_and_user_input() {
        assert_eq!(facility_display_number("배", 1, None), "배1");
        assert_eq!(facility_display_number("방", 2, Some("P-7")), "방2 (P-7)");
        assert_eq!(facility_display_number("방", 3, Some("  ")), "방3");
    }
}
