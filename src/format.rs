use time::OffsetDateTime;

/// Escape user-supplied text for embedding into template markup. Covers
/// the five markup-significant ASCII characters plus the symbol set that
/// shows up in facility capacities and equipment specs (℃, ±, ×, µ, Ω,
/// Greek letters, set/arrow operators), mapped to named or numeric
/// entities so every rendering path agrees on them.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 16);
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            '©' => out.push_str("&copy;"),
            '®' => out.push_str("&reg;"),
            '™' => out.push_str("&trade;"),
            '℃' => out.push_str("&#8451;"),
            '℉' => out.push_str("&#8457;"),
            '±' => out.push_str("&plusmn;"),
            '×' => out.push_str("&times;"),
            '÷' => out.push_str("&divide;"),
            '≥' => out.push_str("&ge;"),
            '≤' => out.push_str("&le;"),
            '≠' => out.push_str("&ne;"),
            '→' => out.push_str("&rarr;"),
            '←' => out.push_str("&larr;"),
            '↑' => out.push_str("&uarr;"),
            '↓' => out.push_str("&darr;"),
            '∞' => out.push_str("&infin;"),
            '∑' => out.push_str("&sum;"),
            '∏' => out.push_str("&prod;"),
            '∫' => out.push_str("&int;"),
            '√' => out.push_str("&radic;"),
            '∂' => out.push_str("&part;"),
            '∆' => out.push_str("&Delta;"),
            '∇' => out.push_str("&nabla;"),
            '⊕' => out.push_str("&oplus;"),
            '⊗' => out.push_str("&otimes;"),
            '⊥' => out.push_str("&perp;"),
            '∥' => out.push_str("&par;"),
            '∠' => out.push_str("&ang;"),
            '∴' => out.push_str("&there4;"),
            '∵' => out.push_str("&becaus;"),
            '∈' => out.push_str("&isin;"),
            '∉' => out.push_str("&notin;"),
            '∋' => out.push_str("&ni;"),
            '∅' => out.push_str("&empty;"),
            '∩' => out.push_str("&cap;"),
            '∪' => out.push_str("&cup;"),
            '⊂' => out.push_str("&sub;"),
            '⊃' => out.push_str("&sup;"),
            '⊆' => out.push_str("&sube;"),
            '⊇' => out.push_str("&supe;"),
            '⇒' => out.push_str("&rArr;"),
            '⇐' => out.push_str("&lArr;"),
            '⇑' => out.push_str("&uArr;"),
            '⇓' => out.push_str("&dArr;"),
            '⇔' => out.push_str("&hArr;"),
            'µ' => out.push_str("&micro;"),
            'Ω' => out.push_str("&Omega;"),
            'α' => out.push_str("&alpha;"),
            'β' => out.push_str("&beta;"),
            'γ' => out.push_str("&gamma;"),
            'δ' => out.push_str("&delta;"),
            'π' => out.push_str("&pi;"),
            'σ' => out.push_str("&sigma;"),
            'λ' => out.push_str("&lambda;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape and convert embedded newlines to `<br>` for multi-line display
/// fields (memo sections).
pub fn escape_multiline(raw: &str) -> String {
    escape_html(raw).replace('\n', "<br>")
}

/// Thousands-separated currency figure: 1234567 -> "1,234,567".
pub fn format_currency(amount: i64) -> String {
    let negative = amount < 0;
    let digits = amount.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (idx, ch) in digits.chars().enumerate() {
        if idx != 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if negative {
        format!("-{out}")
    } else {
        out
    }
}

const KOREAN_DIGITS: [&str; 10] = ["", "일", "이", "삼", "사", "오", "육", "칠", "팔", "구"];
const KOREAN_UNITS: [&str; 4] = ["", "만", "억", "조"];

/// Amount in Korean words with 만/억/조 grouping, as used by the contract
/// payment clauses: 600000 -> "육십만".
pub fn format_amount_korean(amount: i64) -> String {
    if amount == 0 {
        return "영".to_string();
    }
    let mut amount = amount.unsigned_abs();
    let mut result = String::new();
    let mut unit_index = 0usize;

    while amount > 0 && unit_index < KOREAN_UNITS.len() {
        let part = (amount % 10_000) as usize;
        if part > 0 {
            let mut part_str = String::new();
            let thousand = part / 1000;
            let hundred = (part % 1000) / 100;
            let ten = (part % 100) / 10;
            let one = part % 10;
            if thousand > 0 {
                part_str.push_str(KOREAN_DIGITS[thousand]);
                part_str.push('천');
            }
            if hundred > 0 {
                part_str.push_str(KOREAN_DIGITS[hundred]);
                part_str.push('백');
            }
            if ten > 0 {
                part_str.push_str(KOREAN_DIGITS[ten]);
                part_str.push('십');
            }
            if one > 0 {
                part_str.push_str(KOREAN_DIGITS[one]);
            }
            part_str.push_str(KOREAN_UNITS[unit_index]);
            result = format!("{part_str}{result}");
        }
        amount /= 10_000;
        unit_index += 1;
    }

    result
}

/// Display form of an ISO-ish date string: "2025-01-09..." -> "2025. 01. 09."
/// Anything unparseable passes through unchanged; empty/absent shows "-".
pub fn format_date(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return "-".to_string();
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "-".to_string();
    }
    let date_part = trimmed.split(['T', ' ']).next().unwrap_or(trimmed);
    let mut parts = date_part.split('-');
    let (Some(year), Some(month), Some(day)) = (parts.next(), parts.next(), parts.next()) else {
        return trimmed.to_string();
    };
    if year.len() == 4
        && year.chars().all(|c| c.is_ascii_digit())
        && month.chars().all(|c| c.is_ascii_digit())
        && day.chars().all(|c| c.is_ascii_digit())
        && !month.is_empty()
        && !day.is_empty()
    {
        format!("{year}. {month:0>2}. {day:0>2}.")
    } else {
        trimmed.to_string()
    }
}

/// Strip whitespace, brackets, and path-hostile characters from a filename
/// component.
pub fn sanitize_filename_component(raw: &str) -> String {
    raw.chars()
        .filter(|ch| {
            !ch.is_whitespace()
                && !matches!(
                    ch,
                    '(' | ')' | '[' | ']' | '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'
                )
        })
        .collect()
}

/// Two-digit `yymmdd` stamp for a given date.
pub fn yymmdd(date: time::Date) -> String {
    format!(
        "{:02}{:02}{:02}",
        date.year().rem_euclid(100),
        u8::from(date.month()),
        date.day()
    )
}

pub fn today_yymmdd() -> String {
    yymmdd(OffsetDateTime::now_utc().date())
}

/// Date-stamped export filename: `YYMMDD_<doc-code>_<entity>.pdf`.
pub fn export_filename(stamp: &str, doc_code: &str, entity: &str) -> String {
    let entity = sanitize_filename_component(entity);
    let entity = if entity.is_empty() {
        "문서".to_string()
    } else {
        entity
    };
    format!("{stamp}_{doc_code}_{entity}.pdf")
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn escape_covers_markup_significant_characters() {
        let escaped = escape_html(r#"<b>&"'x"#);
        assert_eq!(escaped, "&lt;b&gt;&amp;&quot;&#039;x");
    }

    #[test]
    fn escape_maps_measurement_symbols() {
        assert_eq!(escape_html("250℃ ±5"), "250&#8451; &plusmn;5");
        assert_eq!(escape_html("3.5㎥"), "3.5㎥");
        assert_eq!(escape_html("10µΩ"), "10&micro;&Omega;");
    }

    #[test]
    fn multiline_preserves_line_breaks_as_br() {
        assert_eq!(escape_multiline("a\nb"), "a<br>b");
    }

    #[test]
    fn currency_grouping() {
        assert_eq!(format_currency(0), "0");
        assert_eq!(format_currency(999), "999");
        assert_eq!(format_currency(1000), "1,000");
        assert_eq!(format_currency(1_234_567), "1,234,567");
        assert_eq!(format_currency(-45_000), "-45,000");
    }

    #[test]
    fn korean_amount_words() {
        assert_eq!(format_amount_korean(0), "영");
        assert_eq!(format_amount_korean(600_000), "육십만");
        assert_eq!(format_amount_korean(1_000_000), "일백만");
        assert_eq!(format_amount_korean(12_345), "일만이천삼백사십오");
        assert_eq!(format_amount_korean(400_000), "사십만");
    }

    #[test]
    fn date_display_normalizes_iso_strings() {
        assert_eq!(format_date(Some("2025-01-09")), "2025. 01. 09.");
        assert_eq!(format_date(Some("2025-01-09T12:30:00Z")), "2025. 01. 09.");
        assert_eq!(format_date(Some("next week")), "next week");
        assert_eq!(format_date(Some("")), "-");
        assert_eq!(format_date(None), "-");
    }

    #[test]
    fn filename_is_stamped_and_sanitized() {
        let stamp = yymmdd(date!(2025 - 01 - 09));
        assert_eq!(stamp, "250109");
        assert_eq!(
            export_filename(&stamp, "발주서", "(주) 한국환경"),
            "250109_발주서_주한국환경.pdf"
        );
        assert_eq!(export_filename(&stamp, "계약서", "  "), "250109_계약서_문서.pdf");
    }
}
