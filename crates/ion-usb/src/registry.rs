//! Descriptor table answering GET_DESCRIPTOR.
//!
//! The table is an arena of [`Descriptor`] values built once from a fixed, ordered list and
//! never modified afterwards. Lookup is a linear scan: a DFU device registers fewer than a dozen
//! descriptors, so a scan over a contiguous `Vec` beats any map.

use crate::descriptor::{Descriptor, DescriptorKey, DescriptorKind, DescriptorType};
use crate::error::RegistryError;

#[derive(Debug)]
struct Entry {
    key: DescriptorKey,
    descriptor: Descriptor,
    /// Index assigned by [`RegistryBuilder::push`] rather than given explicitly.
    pushed: bool,
}

/// Collects descriptors in registration order and assigns their indices.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: Vec<Entry>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `descriptor` at the next free index for its descriptor type: the first device,
    /// configuration, string and BOS descriptor pushed all get index 0, later strings 1, 2, ...
    ///
    /// Numbering continues after the last pushed index of the same type and steps over indices
    /// taken by [`RegistryBuilder::insert`].
    pub fn push(&mut self, descriptor: Descriptor) -> Result<DescriptorKey, RegistryError> {
        let descriptor_type = descriptor.descriptor_type();
        let mut next = match self
            .entries
            .iter()
            .filter(|e| e.pushed && e.descriptor.descriptor_type() == descriptor_type)
            .map(|e| e.key.index)
            .max()
        {
            Some(last) => last.checked_add(1),
            None => Some(0),
        };
        let key = loop {
            let index = next.ok_or(RegistryError::IndexOverflow(u8::MAX))?;
            let key = DescriptorKey::new(descriptor_type, index);
            if !self.entries.iter().any(|e| e.key == key) {
                break key;
            }
            next = index.checked_add(1);
        };
        self.insert_key(key, descriptor, true)?;
        Ok(key)
    }

    /// Registers `descriptor` at an explicit index.
    pub fn insert(
        &mut self,
        index: u8,
        descriptor: Descriptor,
    ) -> Result<DescriptorKey, RegistryError> {
        let key = DescriptorKey::new(descriptor.descriptor_type(), index);
        self.insert_key(key, descriptor, false)?;
        Ok(key)
    }

    fn insert_key(
        &mut self,
        key: DescriptorKey,
        descriptor: Descriptor,
        pushed: bool,
    ) -> Result<(), RegistryError> {
        if self.entries.iter().any(|e| e.key == key) {
            return Err(RegistryError::DuplicateKey(key));
        }
        self.entries.push(Entry {
            key,
            descriptor,
            pushed,
        });
        Ok(())
    }

    pub fn build(self) -> Result<DescriptorRegistry, RegistryError> {
        for entry in &self.entries {
            validate_entry(entry)?;
        }

        require_single(&self.entries, DescriptorKind::Device)?;
        require_single(&self.entries, DescriptorKind::Configuration)?;

        // String index 0 is the LANGID list and nothing else.
        let string0 = DescriptorKey::new(DescriptorType::String, 0);
        match self.entries.iter().find(|e| e.key == string0) {
            Some(e) if e.descriptor.kind() == DescriptorKind::LanguageIds => {}
            Some(_) => {
                return Err(RegistryError::UnexpectedIndex {
                    what: DescriptorKind::Text.name(),
                    index: 0,
                    expected: 1,
                })
            }
            None if self
                .entries
                .iter()
                .any(|e| e.descriptor.descriptor_type() == DescriptorType::String) =>
            {
                return Err(RegistryError::MissingDescriptor(
                    DescriptorKind::LanguageIds.name(),
                ))
            }
            None => {}
        }
        for entry in &self.entries {
            if entry.descriptor.kind() == DescriptorKind::LanguageIds && entry.key.index != 0 {
                return Err(RegistryError::UnexpectedIndex {
                    what: DescriptorKind::LanguageIds.name(),
                    index: entry.key.index,
                    expected: 0,
                });
            }
        }

        let bos: Vec<_> = self
            .entries
            .iter()
            .filter(|e| e.descriptor.kind() == DescriptorKind::Bos)
            .collect();
        if let Some(extra) = bos.iter().find(|e| e.key.index != 0) {
            return Err(RegistryError::UnexpectedIndex {
                what: DescriptorKind::Bos.name(),
                index: extra.key.index,
                expected: 0,
            });
        }

        Ok(DescriptorRegistry {
            entries: self.entries,
        })
    }
}

fn require_single(entries: &[Entry], kind: DescriptorKind) -> Result<(), RegistryError> {
    let mut found = entries.iter().filter(|e| e.descriptor.kind() == kind);
    let first = found
        .next()
        .ok_or(RegistryError::MissingDescriptor(kind.name()))?;
    if first.key.index != 0 {
        return Err(RegistryError::UnexpectedIndex {
            what: kind.name(),
            index: first.key.index,
            expected: 0,
        });
    }
    if let Some(extra) = found.next() {
        return Err(RegistryError::UnexpectedIndex {
            what: kind.name(),
            index: extra.key.index,
            expected: 0,
        });
    }
    Ok(())
}

fn validate_entry(entry: &Entry) -> Result<(), RegistryError> {
    let key = entry.key;
    let desc = &entry.descriptor;
    let bytes = desc.as_bytes();

    if bytes.len() < 2 {
        return Err(RegistryError::LengthMismatch {
            key,
            declared: bytes.first().copied().unwrap_or(0) as usize,
            actual: bytes.len(),
        });
    }
    if bytes[1] != key.descriptor_type {
        return Err(RegistryError::TypeMismatch {
            key,
            found: bytes[1],
        });
    }

    let header = bytes[0] as usize;
    if desc.kind().has_total_length() {
        let total = desc.total_len().map(usize::from);
        if header > bytes.len() || total != Some(bytes.len()) {
            return Err(RegistryError::LengthMismatch {
                key,
                declared: total.unwrap_or(header),
                actual: bytes.len(),
            });
        }
    } else if header != bytes.len() {
        return Err(RegistryError::LengthMismatch {
            key,
            declared: header,
            actual: bytes.len(),
        });
    }
    Ok(())
}

/// Immutable `(type, index) -> bytes` table.
#[derive(Debug)]
pub struct DescriptorRegistry {
    entries: Vec<Entry>,
}

impl DescriptorRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn resolve(&self, descriptor_type: u8, index: u8) -> Option<&[u8]> {
        self.get(DescriptorKey {
            descriptor_type,
            index,
        })
        .map(Descriptor::as_bytes)
    }

    pub fn get(&self, key: DescriptorKey) -> Option<&Descriptor> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| &e.descriptor)
    }

    /// Registered descriptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (DescriptorKey, &Descriptor)> + '_ {
        self.entries.iter().map(|e| (e.key, &e.descriptor))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
