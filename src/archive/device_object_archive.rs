//! Device Object Archive
//!
//! In-memory model of the binary archive: a table of named resources, each
//! with backend-independent *common* data plus one optional data blob per
//! [`ArchiveDeviceType`], and one shader bytecode list per backend.
//!
//! # Binary Layout
//!
//! All integers are little-endian `u32`; byte fields and strings are
//! `u32`-length-prefixed.
//!
//! ```text
//! magic, version, hasher_version, content_version, api_version, build_tag
//! resource_count
//!   { resource_type, name, common, device_data[ARCHIVE_DEVICE_COUNT] }*
//! { shader_count, shader_data* }[ARCHIVE_DEVICE_COUNT]
//! ```
//!
//! Pipeline and standalone shader entries store, as device data, the
//! `bincode`-encoded list of indices into that backend's shader list
//! (see [`encode_shader_indices`]).

use std::collections::BTreeMap;
use std::fmt;
use std::io::{Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::archive::ResourceType;
use crate::archive::io::{ReadArchiveExt, WriteArchiveExt};
use crate::errors::{CacheError, Result};
use crate::graphics::shader::{ShaderCompileFlags, ShaderDesc};
use crate::graphics::{ARCHIVE_DEVICE_COUNT, ArchiveDeviceType};
use crate::hash::HASHER_VERSION;

/// Archive magic number.
pub const ARCHIVE_MAGIC: u32 = 0xDE00_000A;

/// Archive container format version.
pub const ARCHIVE_VERSION: u32 = 3;

/// Version of the description encoding inside resource data.
pub const API_VERSION: u32 = 1;

// ─── Shader Data ─────────────────────────────────────────────────────────────

/// One entry of a backend shader list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedShaderData {
    pub desc: ShaderDesc,
    pub entry_point: String,
    pub compile_flags: ShaderCompileFlags,
    pub bytecode: Vec<u8>,
}

impl ArchivedShaderData {
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Encodes per-slot shader indices for pipeline and shader device data.
pub fn encode_shader_indices(indices: &[Option<u32>]) -> Result<Vec<u8>> {
    Ok(bincode::serialize(indices)?)
}

pub fn decode_shader_indices(bytes: &[u8]) -> Result<Vec<Option<u32>>> {
    Ok(bincode::deserialize(bytes)?)
}

// ─── Resource Data ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceData {
    pub common: Vec<u8>,
    pub device_specific: [Vec<u8>; ARCHIVE_DEVICE_COUNT],
}

impl ResourceData {
    #[must_use]
    pub fn new(common: Vec<u8>) -> Self {
        Self {
            common,
            device_specific: Default::default(),
        }
    }

    /// Device data for `device`, `None` when absent.
    #[must_use]
    pub fn device_data(&self, device: ArchiveDeviceType) -> Option<&[u8]> {
        let data = &self.device_specific[device.index()];
        (!data.is_empty()).then_some(data.as_slice())
    }

    pub fn set_device_data(&mut self, device: ArchiveDeviceType, data: Vec<u8>) {
        self.device_specific[device.index()] = data;
    }

    #[must_use]
    pub fn has_any_device_data(&self) -> bool {
        self.device_specific.iter().any(|data| !data.is_empty())
    }
}

// ─── Device Object Archive ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceObjectArchive {
    content_version: u32,
    build_tag: String,
    resources: BTreeMap<(ResourceType, String), ResourceData>,
    shaders: [Vec<Vec<u8>>; ARCHIVE_DEVICE_COUNT],
}

impl Default for DeviceObjectArchive {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeviceObjectArchive {
    #[must_use]
    pub fn new(content_version: u32) -> Self {
        Self {
            content_version,
            build_tag: env!("CARGO_PKG_VERSION").to_string(),
            resources: BTreeMap::new(),
            shaders: Default::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn content_version(&self) -> u32 {
        self.content_version
    }

    pub fn set_content_version(&mut self, content_version: u32) {
        self.content_version = content_version;
    }

    #[must_use]
    pub fn build_tag(&self) -> &str {
        &self.build_tag
    }

    // ── Resources ────────────────────────────────────────────────────────

    #[must_use]
    pub fn resource(&self, kind: ResourceType, name: &str) -> Option<&ResourceData> {
        self.resources.get(&(kind, name.to_string()))
    }

    pub fn resource_mut(&mut self, kind: ResourceType, name: &str) -> Option<&mut ResourceData> {
        self.resources.get_mut(&(kind, name.to_string()))
    }

    /// Inserts a resource, or fills in missing device data of an existing
    /// resource with the same common data.
    pub fn insert_resource(&mut self, kind: ResourceType, name: &str, data: ResourceData) -> Result<()> {
        match self.resources.get_mut(&(kind, name.to_string())) {
            None => {
                self.resources.insert((kind, name.to_string()), data);
                Ok(())
            }
            Some(existing) if existing.common == data.common => {
                for (dst, src) in existing.device_specific.iter_mut().zip(data.device_specific) {
                    if dst.is_empty() {
                        *dst = src;
                    }
                }
                Ok(())
            }
            Some(_) => Err(CacheError::CommonDataMismatch {
                kind,
                name: name.to_string(),
            }),
        }
    }

    pub fn resources(&self) -> impl Iterator<Item = (ResourceType, &str, &ResourceData)> {
        self.resources
            .iter()
            .map(|((kind, name), data)| (*kind, name.as_str(), data))
    }

    pub fn resource_names(&self, kind: ResourceType) -> impl Iterator<Item = &str> {
        self.resources
            .keys()
            .filter(move |(ty, _)| *ty == kind)
            .map(|(_, name)| name.as_str())
    }

    #[must_use]
    pub fn resource_count(&self, kind: ResourceType) -> usize {
        self.resource_names(kind).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Keeps only the resources for which `keep` returns `true`. Shader lists
    /// are left untouched.
    pub fn retain_resources(&mut self, mut keep: impl FnMut(ResourceType, &str) -> bool) {
        self.resources.retain(|(kind, name), _| keep(*kind, name));
    }

    // ── Shaders ──────────────────────────────────────────────────────────

    #[must_use]
    pub fn shaders(&self, device: ArchiveDeviceType) -> &[Vec<u8>] {
        &self.shaders[device.index()]
    }

    #[must_use]
    pub fn shader(&self, device: ArchiveDeviceType, index: u32) -> Option<&[u8]> {
        self.shaders[device.index()]
            .get(index as usize)
            .map(Vec::as_slice)
    }

    /// Appends shader data to a backend list and returns its index.
    pub fn push_shader(&mut self, device: ArchiveDeviceType, data: Vec<u8>) -> u32 {
        let list = &mut self.shaders[device.index()];
        list.push(data);
        (list.len() - 1) as u32
    }

    // ── Device Data Operations ───────────────────────────────────────────

    /// Strips one backend's data from every resource and drops its shaders.
    pub fn remove_device_data(&mut self, device: ArchiveDeviceType) {
        for data in self.resources.values_mut() {
            data.device_specific[device.index()].clear();
        }
        self.shaders[device.index()].clear();
    }

    /// Copies one backend's data from `src`.
    ///
    /// Every resource of this archive must exist in `src` with identical
    /// common data.
    pub fn append_device_data(&mut self, src: &Self, device: ArchiveDeviceType) -> Result<()> {
        for ((kind, name), dst_data) in &self.resources {
            let src_data = src
                .resources
                .get(&(*kind, name.clone()))
                .ok_or_else(|| CacheError::ResourceNotFound {
                    kind: *kind,
                    name: name.clone(),
                })?;
            if src_data.common != dst_data.common {
                return Err(CacheError::CommonDataMismatch {
                    kind: *kind,
                    name: name.clone(),
                });
            }
        }

        for ((kind, name), dst_data) in &mut self.resources {
            if let Some(src_data) = src.resources.get(&(*kind, name.clone())) {
                dst_data.device_specific[device.index()] =
                    src_data.device_specific[device.index()].clone();
            }
        }
        self.shaders[device.index()] = src.shaders[device.index()].clone();
        Ok(())
    }

    /// Unions `other` into this archive.
    ///
    /// Shader lists are deduplicated and shader indices of merged entries
    /// remapped. A name present in both archives must have identical common
    /// data; its missing device data is taken from `other`.
    pub fn merge(&mut self, other: &Self) -> Result<()> {
        for ((kind, name), src_data) in &other.resources {
            if let Some(dst_data) = self.resources.get(&(*kind, name.clone()))
                && dst_data.common != src_data.common
            {
                return Err(CacheError::CommonDataMismatch {
                    kind: *kind,
                    name: name.clone(),
                });
            }
        }

        let mut remaps: [Vec<u32>; ARCHIVE_DEVICE_COUNT] = Default::default();
        for device in ArchiveDeviceType::ALL {
            let mut existing: FxHashMap<Vec<u8>, u32> = self.shaders[device.index()]
                .iter()
                .enumerate()
                .map(|(index, data)| (data.clone(), index as u32))
                .collect();
            for data in other.shaders(device) {
                let index = match existing.get(data) {
                    Some(&index) => index,
                    None => {
                        let index = self.push_shader(device, data.clone());
                        existing.insert(data.clone(), index);
                        index
                    }
                };
                remaps[device.index()].push(index);
            }
        }

        for ((kind, name), src_data) in &other.resources {
            let mut data = src_data.clone();
            if kind.has_shader_indices() {
                for device in ArchiveDeviceType::ALL {
                    let slot = &mut data.device_specific[device.index()];
                    if slot.is_empty() {
                        continue;
                    }
                    let remap = &remaps[device.index()];
                    let indices = decode_shader_indices(slot)?
                        .into_iter()
                        .map(|index| {
                            index
                                .map(|i| {
                                    remap.get(i as usize).copied().ok_or_else(|| {
                                        CacheError::Corrupt(format!(
                                            "{kind} '{name}' references missing {device} shader {i}"
                                        ))
                                    })
                                })
                                .transpose()
                        })
                        .collect::<Result<Vec<_>>>()?;
                    *slot = encode_shader_indices(&indices)?;
                }
            }
            self.insert_resource(*kind, name, data)?;
        }
        Ok(())
    }

    /// Checks that every shader index refers to an existing shader.
    pub fn validate(&self) -> Result<()> {
        for ((kind, name), data) in &self.resources {
            if !kind.has_shader_indices() {
                continue;
            }
            for device in ArchiveDeviceType::ALL {
                let Some(bytes) = data.device_data(device) else {
                    continue;
                };
                let count = self.shaders(device).len();
                for index in decode_shader_indices(bytes)?.into_iter().flatten() {
                    if index as usize >= count {
                        return Err(CacheError::Corrupt(format!(
                            "{kind} '{name}' references {device} shader {index}, but only {count} are present"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    // ── Serialization ────────────────────────────────────────────────────

    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.write_to(&mut bytes)?;
        Ok(bytes)
    }

    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(ARCHIVE_MAGIC)?;
        writer.write_u32::<LittleEndian>(ARCHIVE_VERSION)?;
        writer.write_u32::<LittleEndian>(HASHER_VERSION)?;
        writer.write_u32::<LittleEndian>(self.content_version)?;
        writer.write_u32::<LittleEndian>(API_VERSION)?;
        writer.write_string_u32(&self.build_tag)?;

        writer.write_len_u32(self.resources.len())?;
        for ((kind, name), data) in &self.resources {
            writer.write_u32::<LittleEndian>(*kind as u32)?;
            writer.write_string_u32(name)?;
            writer.write_len_prefixed_bytes_u32(&data.common)?;
            for device_data in &data.device_specific {
                writer.write_len_prefixed_bytes_u32(device_data)?;
            }
        }

        for list in &self.shaders {
            writer.write_len_u32(list.len())?;
            for shader in list {
                writer.write_len_prefixed_bytes_u32(shader)?;
            }
        }
        Ok(())
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let archive = Self::read_from(&mut cursor)?;
        if cursor.position() as usize != bytes.len() {
            return Err(CacheError::Corrupt(format!(
                "{} trailing bytes after archive data",
                bytes.len() - cursor.position() as usize
            )));
        }
        Ok(archive)
    }

    pub fn read_from<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let magic = reader.read_u32::<LittleEndian>()?;
        if magic != ARCHIVE_MAGIC {
            return Err(CacheError::InvalidMagic(magic));
        }
        let version = reader.read_u32::<LittleEndian>()?;
        if version != ARCHIVE_VERSION {
            return Err(CacheError::UnsupportedVersion {
                found: version,
                expected: ARCHIVE_VERSION,
            });
        }
        let hasher_version = reader.read_u32::<LittleEndian>()?;
        if hasher_version != HASHER_VERSION {
            return Err(CacheError::HasherVersionMismatch {
                found: hasher_version,
                expected: HASHER_VERSION,
            });
        }
        let content_version = reader.read_u32::<LittleEndian>()?;
        let api_version = reader.read_u32::<LittleEndian>()?;
        if api_version != API_VERSION {
            return Err(CacheError::UnsupportedVersion {
                found: api_version,
                expected: API_VERSION,
            });
        }
        let build_tag = reader.read_string_u32()?;

        let mut resources = BTreeMap::new();
        let resource_count = reader.read_len_u32()?;
        for _ in 0..resource_count {
            let kind = ResourceType::from_u32(reader.read_u32::<LittleEndian>()?)?;
            let name = reader.read_string_u32()?;
            let mut data = ResourceData::new(reader.read_len_prefixed_bytes_u32()?);
            for device_data in &mut data.device_specific {
                *device_data = reader.read_len_prefixed_bytes_u32()?;
            }
            if resources.insert((kind, name.clone()), data).is_some() {
                return Err(CacheError::Corrupt(format!("duplicate {kind} '{name}'")));
            }
        }

        let mut shaders: [Vec<Vec<u8>>; ARCHIVE_DEVICE_COUNT] = Default::default();
        for list in &mut shaders {
            let count = reader.read_len_u32()?;
            for _ in 0..count {
                list.push(reader.read_len_prefixed_bytes_u32()?);
            }
        }

        Ok(Self {
            content_version,
            build_tag,
            resources,
            shaders,
        })
    }
}

// ─── Content Dump ────────────────────────────────────────────────────────────

impl fmt::Display for DeviceObjectArchive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Archive contents:")?;
        writeln!(f, "  Header")?;
        writeln!(f, "    version:         {ARCHIVE_VERSION}")?;
        writeln!(f, "    hasher version:  {HASHER_VERSION}")?;
        writeln!(f, "    content version: {}", self.content_version)?;
        writeln!(f, "    build tag:       {}", self.build_tag)?;

        for kind in ResourceType::ALL {
            let count = self.resource_count(kind);
            if count == 0 {
                continue;
            }
            writeln!(f, "  {} ({count})", kind.plural_name())?;
            for name in self.resource_names(kind) {
                let Some(data) = self.resource(kind, name) else {
                    continue;
                };
                writeln!(f, "    {name}")?;
                writeln!(f, "      common: {} bytes", data.common.len())?;
                for device in ArchiveDeviceType::ALL {
                    if let Some(bytes) = data.device_data(device) {
                        writeln!(f, "      {device}: {} bytes", bytes.len())?;
                    }
                }
            }
        }

        for device in ArchiveDeviceType::ALL {
            let list = self.shaders(device);
            if list.is_empty() {
                continue;
            }
            writeln!(f, "  {device} shaders ({})", list.len())?;
            for (index, shader) in list.iter().enumerate() {
                match ArchivedShaderData::decode(shader) {
                    Ok(data) => writeln!(
                        f,
                        "    [{index}] '{}' {:?}, {} bytes",
                        data.desc.name,
                        data.desc.shader_type,
                        data.bytecode.len()
                    )?,
                    Err(_) => writeln!(f, "    [{index}] <undecodable>, {} bytes", shader.len())?,
                }
            }
        }
        Ok(())
    }
}
