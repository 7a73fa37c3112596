use std::sync::Arc;

use fnv::FnvHashMap;

use crate::common::constants::FIELD_INFOS_FORMAT;
use crate::common::errors::{DataCorruption, Incompatibility};
use crate::directory::{DataInput, DataOutput, Directory};

const OMIT_TERM_FREQ_AND_POSITIONS: u8 = 0x1;
const STORE_PAYLOADS: u8 = 0x2;

/// Per-segment options of one indexed field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: String,
    pub number: u32,
    pub omit_term_freq_and_positions: bool,
    /// Positions of this field carry a payload length in the prox stream.
    pub store_payloads: bool,
}

/// Fields of a segment, numbered in name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldInfos {
    by_number: Vec<FieldInfo>,
    by_name: FnvHashMap<String, u32>,
}

impl FieldInfos {
    /// Number fields in ascending name order. Duplicate names keep their first entry.
    pub fn new<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = (String, bool, bool)>,
    {
        let mut fields: Vec<(String, bool, bool)> = fields.into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));
        fields.dedup_by(|a, b| a.0 == b.0);
        let mut infos = FieldInfos::default();
        for (name, omit_tf, store_payloads) in fields {
            infos.push(name, omit_tf, store_payloads);
        }
        infos
    }

    fn push(&mut self, name: String, omit_term_freq_and_positions: bool, store_payloads: bool) {
        let number = self.by_number.len() as u32;
        self.by_name.insert(name.clone(), number);
        self.by_number.push(FieldInfo {
            name,
            number,
            omit_term_freq_and_positions,
            store_payloads: store_payloads && !omit_term_freq_and_positions,
        });
    }

    pub fn len(&self) -> usize {
        self.by_number.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_number.is_empty()
    }

    pub fn field_info(&self, name: &str) -> Option<&FieldInfo> {
        self.by_name.get(name).map(|number| &self.by_number[*number as usize])
    }

    pub fn field_info_by_number(&self, number: u32) -> Option<&FieldInfo> {
        self.by_number.get(number as usize)
    }

    pub fn field_number(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldInfo> {
        self.by_number.iter()
    }

    /// Whether any field keeps positions, i.e. whether a `.prx` file exists.
    pub fn has_prox(&self) -> bool {
        self.by_number.iter().any(|fi| !fi.omit_term_freq_and_positions)
    }

    pub fn write(&self, directory: &dyn Directory, file_name: &str) -> crate::Result<()> {
        let mut output = directory.create_output(file_name)?;
        output.write_int(FIELD_INFOS_FORMAT)?;
        output.write_vint(self.by_number.len() as u32)?;
        for fi in &self.by_number {
            let mut bits = 0u8;
            if fi.omit_term_freq_and_positions {
                bits |= OMIT_TERM_FREQ_AND_POSITIONS;
            }
            if fi.store_payloads {
                bits |= STORE_PAYLOADS;
            }
            output.write_string(&fi.name)?;
            output.write_byte(bits)?;
        }
        output.close()
    }

    pub fn read(directory: &dyn Directory, file_name: &str) -> crate::Result<Arc<Self>> {
        let mut input = directory.open_input(file_name)?;
        let format = input.read_int()?;
        if format != FIELD_INFOS_FORMAT {
            return Err(Incompatibility {
                file_name: file_name.to_string(),
                library_format: FIELD_INFOS_FORMAT,
                index_format: format,
            }
            .into());
        }
        let count = input.read_vint()?;
        let mut infos = FieldInfos::default();
        for _ in 0..count {
            let name = input.read_string()?;
            let bits = input.read_byte()?;
            if bits & !(OMIT_TERM_FREQ_AND_POSITIONS | STORE_PAYLOADS) != 0 {
                return Err(DataCorruption::new(
                    file_name.into(),
                    format!("unknown field flags {bits:#x} for field `{name}`"),
                )
                .into());
            }
            if let Some(previous) = infos.by_number.last() {
                if previous.name >= name {
                    return Err(DataCorruption::new(
                        file_name.into(),
                        format!("fields out of order: `{}` before `{}`", previous.name, name),
                    )
                    .into());
                }
            }
            infos.push(
                name,
                bits & OMIT_TERM_FREQ_AND_POSITIONS != 0,
                bits & STORE_PAYLOADS != 0,
            );
        }
        if input.file_pointer() != input.len() {
            return Err(DataCorruption::new(
                file_name.into(),
                format!("{} trailing bytes", input.len() - input.file_pointer()),
            )
            .into());
        }
        Ok(Arc::new(infos))
    }
}
