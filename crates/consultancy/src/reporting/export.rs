use std::collections::HashMap;

use serde::Serialize;

use crate::admissions::{ClassId, StatusField, Student};

#[derive(Debug, Serialize)]
struct RosterRow<'a> {
    #[serde(rename = "ID")]
    id: &'a str,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Phone")]
    phone: &'a str,
    #[serde(rename = "Class")]
    class: &'a str,
    #[serde(rename = "COE Status")]
    coe_status: &'static str,
    #[serde(rename = "Income")]
    income: i64,
    #[serde(rename = "Payment Received")]
    payment_received: i64,
    #[serde(rename = "Payment Remaining")]
    payment_remaining: i64,
}

/// Writes one CSV row per student, headers first.
pub fn roster_csv(
    students: &[Student],
    class_names: &HashMap<ClassId, String>,
) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for student in students {
        let class = student
            .class_id
            .as_ref()
            .and_then(|id| class_names.get(id))
            .map_or("", String::as_str);
        writer.serialize(RosterRow {
            id: &student.id.0,
            name: student.full_name(),
            phone: student.phone.as_deref().unwrap_or(""),
            class,
            coe_status: student.coe_status.label(),
            income: student.income,
            payment_received: student.payment_received,
            payment_remaining: student.payment_remaining,
        })?;
    }
    writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))
}
