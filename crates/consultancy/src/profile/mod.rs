//! Printable student profile: layout here, byte rendering behind a trait.

mod pdf;

pub use pdf::PdfRenderer;

use chrono::{Datelike, NaiveDate};

use crate::admissions::Student;

const NOT_AVAILABLE: &str = "N/A";

/// Renderer-neutral building blocks of a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Title(String),
    Photo(Photo),
    Heading(String),
    Line(String),
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Paragraph(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileDocument {
    pub file_name: String,
    pub blocks: Vec<Block>,
}

/// A JPEG kept in its compressed form, with the frame size read from its header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    pub width: u16,
    pub height: u16,
    pub components: u8,
    pub data: Vec<u8>,
}

impl Photo {
    /// `None` unless `data` is a JPEG with a readable frame header.
    pub fn from_jpeg(data: Vec<u8>) -> Option<Self> {
        let (width, height, components) = jpeg_frame(&data)?;
        Some(Self {
            width,
            height,
            components,
            data,
        })
    }
}

/// Walks marker segments up to the first start-of-frame.
fn jpeg_frame(data: &[u8]) -> Option<(u16, u16, u8)> {
    if !data.starts_with(&[0xff, 0xd8]) {
        return None;
    }
    let mut at = 2;
    while at + 4 <= data.len() {
        if data[at] != 0xff {
            return None;
        }
        let marker = data[at + 1];
        if marker == 0xff {
            at += 1;
            continue;
        }
        let length = usize::from(u16::from_be_bytes([data[at + 2], data[at + 3]]));
        // C4, C8 and CC share the range but are not frames.
        let is_frame = matches!(marker, 0xc0..=0xcf) && !matches!(marker, 0xc4 | 0xc8 | 0xcc);
        if is_frame {
            let frame = data.get(at + 4..at + 2 + length)?;
            if frame.len() < 6 {
                return None;
            }
            let height = u16::from_be_bytes([frame[1], frame[2]]);
            let width = u16::from_be_bytes([frame[3], frame[4]]);
            let components = frame[5];
            if width == 0 || height == 0 || !matches!(components, 1 | 3 | 4) {
                return None;
            }
            return Some((width, height, components));
        }
        at += 2 + length;
    }
    None
}

impl ProfileDocument {
    /// Puts the photo directly under the title.
    pub fn with_photo(mut self, photo: Photo) -> Self {
        let at = usize::from(!self.blocks.is_empty());
        self.blocks.insert(at, Block::Photo(photo));
        self
    }

    pub fn from_student(student: &Student) -> Self {
        let mut blocks = vec![Block::Title("Student Profile".to_string())];

        let info = [
            ("Full Name", Some(student.full_name())),
            ("Email", student.email.clone()),
            ("Phone", student.phone.clone()),
            ("Sex", student.sex.clone()),
            ("DOB", student.dob.map(long_date)),
            ("POB", student.pob.clone()),
            ("Current Address", student.curr_add.clone()),
        ];
        for (label, value) in info {
            let value = value
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string());
            blocks.push(Block::Line(format!("{label}: {value}")));
        }

        if !student.family_members.is_empty() {
            blocks.push(Block::Heading("Family Members".to_string()));
            blocks.push(Block::Table {
                headers: headers(&["Name", "Relation", "Contact", "DOB", "Occupation"]),
                rows: student
                    .family_members
                    .iter()
                    .map(|member| {
                        vec![
                            member.name.clone(),
                            member.relationship.clone(),
                            member.contact.clone().unwrap_or_default(),
                            member.dob.map(long_date).unwrap_or_default(),
                            member.occupation.clone().unwrap_or_default(),
                        ]
                    })
                    .collect(),
            });
        }

        if !student.academic_records.is_empty() {
            blocks.push(Block::Heading("Academic Records".to_string()));
            blocks.push(Block::Table {
                headers: headers(&["Type", "School", "Faculty", "From", "To"]),
                rows: student
                    .academic_records
                    .iter()
                    .map(|record| {
                        vec![
                            record.level.clone(),
                            record.school_name.clone(),
                            record.faculty.clone().unwrap_or_default(),
                            year(record.from),
                            year(record.to),
                        ]
                    })
                    .collect(),
            });
        }

        if let Some(remarks) = student.remarks.as_deref().filter(|text| !text.trim().is_empty()) {
            blocks.push(Block::Heading("Remarks".to_string()));
            blocks.push(Block::Paragraph(remarks.to_string()));
        }

        Self {
            file_name: format!(
                "profile_{}_{}.pdf",
                file_safe(&student.first_name),
                file_safe(&student.last_name)
            ),
            blocks,
        }
    }
}

fn headers(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|label| label.to_string()).collect()
}

fn long_date(date: NaiveDate) -> String {
    date.format("%a %b %d %Y").to_string()
}

fn year(date: Option<NaiveDate>) -> String {
    date.map(|date| date.year().to_string()).unwrap_or_default()
}

fn file_safe(part: &str) -> String {
    part.trim()
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("profile rendering failed: {0}")]
    Output(String),
}

/// Turns a laid-out profile into a downloadable document.
pub trait ProfileRenderer: Send + Sync {
    fn content_type(&self) -> &'static str;
    fn render(&self, document: &ProfileDocument) -> Result<Vec<u8>, RenderError>;
}

/// A 3x2 baseline JPEG header with no scan data.
#[cfg(test)]
pub(crate) fn tiny_jpeg() -> Vec<u8> {
    let mut bytes = vec![0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10];
    bytes.extend_from_slice(b"JFIF\0");
    bytes.extend_from_slice(&[1, 1, 0, 0, 1, 0, 1, 0, 0]);
    bytes.extend_from_slice(&[0xff, 0xc0, 0x00, 0x11, 0x08, 0x00, 0x02, 0x00, 0x03, 0x03]);
    bytes.extend_from_slice(&[1, 0x22, 0, 2, 0x11, 1, 3, 0x11, 1]);
    bytes.extend_from_slice(&[0xff, 0xd9]);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admissions::{AcademicRecord, FamilyMember, StudentId, StudentInput};

    fn student() -> Student {
        let mut student = StudentInput {
            first_name: Some("Asha".to_string()),
            last_name: Some("Gurung".to_string()),
            email: Some("asha@example.com".to_string()),
            dob: NaiveDate::from_ymd_opt(2001, 3, 9),
            ..StudentInput::default()
        }
        .into_student(StudentId("stu-1".to_string()));
        student.family_members.push(FamilyMember {
            name: "Maya Gurung".to_string(),
            relationship: "Mother".to_string(),
            contact: None,
            dob: None,
            occupation: Some("Teacher".to_string()),
        });
        student.academic_records.push(AcademicRecord {
            level: "+2".to_string(),
            school_name: "Valley College".to_string(),
            faculty: Some("Science".to_string()),
            from: NaiveDate::from_ymd_opt(2017, 4, 1),
            to: NaiveDate::from_ymd_opt(2019, 3, 31),
            grade: None,
        });
        student
    }

    #[test]
    fn lays_out_personal_info_with_placeholders() {
        let document = ProfileDocument::from_student(&student());
        assert_eq!(document.file_name, "profile_Asha_Gurung.pdf");
        assert_eq!(document.blocks[0], Block::Title("Student Profile".to_string()));
        assert!(document
            .blocks
            .contains(&Block::Line("Full Name: Asha Gurung".to_string())));
        assert!(document
            .blocks
            .contains(&Block::Line("Phone: N/A".to_string())));
        assert!(document
            .blocks
            .contains(&Block::Line("DOB: Fri Mar 09 2001".to_string())));
    }

    #[test]
    fn includes_tables_only_when_populated() {
        let document = ProfileDocument::from_student(&student());
        let academic = document.blocks.iter().find_map(|block| match block {
            Block::Table { headers, rows } if headers[0] == "Type" => Some(rows.clone()),
            _ => None,
        });
        assert_eq!(
            academic,
            Some(vec![vec![
                "+2".to_string(),
                "Valley College".to_string(),
                "Science".to_string(),
                "2017".to_string(),
                "2019".to_string(),
            ]])
        );

        let mut bare = student();
        bare.family_members.clear();
        bare.academic_records.clear();
        let document = ProfileDocument::from_student(&bare);
        assert!(!document
            .blocks
            .iter()
            .any(|block| matches!(block, Block::Table { .. } | Block::Heading(_))));
    }

    #[test]
    fn reads_jpeg_frame_size_and_places_photo_under_title() {
        let photo = Photo::from_jpeg(tiny_jpeg()).expect("frame header");
        assert_eq!((photo.width, photo.height, photo.components), (3, 2, 3));

        let document = ProfileDocument::from_student(&student()).with_photo(photo.clone());
        assert_eq!(document.blocks[0], Block::Title("Student Profile".to_string()));
        assert_eq!(document.blocks[1], Block::Photo(photo));
    }

    #[test]
    fn rejects_bytes_without_a_frame_header() {
        assert!(Photo::from_jpeg(b"\x89PNG\r\n\x1a\n".to_vec()).is_none());
        assert!(Photo::from_jpeg(vec![0xff, 0xd8, 0xff, 0xd9]).is_none());

        let mut truncated = tiny_jpeg();
        truncated.truncate(24);
        assert!(Photo::from_jpeg(truncated).is_none());
    }
}
