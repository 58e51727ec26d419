//! Two-pass layout of one object body.
//!
//! Pass 1 resolves every symbol through the table builder, caches the index,
//! and sizes each skip header at the 5-byte worst case. Pass 2 shrinks each
//! header's reservation to the width of its pass-1 distance and recomputes
//! every position. Distances can only shrink between the passes, so every
//! final distance fits its reservation; bytes a reservation holds beyond the
//! final distance's natural width are padding and stay in the body.
//!
//! The layout is never iterated further: the padded widths are part of the
//! format.

use std::collections::HashMap;

use gpak_codec::adaptive::{self, MAX_ENCODED_LEN};
use gpak_tables::TableBuilder;
use gpak_types::{inline_mode, ExportIndex, OpcodeTag, TypeIndex};
use serde::Serialize;
use tracing::debug;

use crate::error::{BinarizeResult, InvariantViolation};
use crate::opcode::{BufferRef, ObjectHandle, Opcode, PendingBuffer, SkipId};

/// Final placement of one skip region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SkipLayout {
    pub id: u32,
    /// Body offset of the header's tag byte.
    pub header_pos: usize,
    /// Body offset the label marks.
    pub label_pos: usize,
    /// Bytes reserved for the distance.
    pub reserved: usize,
}

impl SkipLayout {
    /// Checked against `u32` when the layout is built.
    pub fn distance(&self) -> u32 {
        (self.label_pos - self.header_pos) as u32
    }

    pub fn wasted(&self) -> usize {
        self.reserved - adaptive::encoded_len_u32(self.distance())
    }
}

fn skip_distance(header_pos: usize, label_pos: usize) -> BinarizeResult<u32> {
    crate::opcode::size_u32("skip distance", label_pos - header_pos)
}

/// Size and skip placement of one laid-out body.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ObjectLayout {
    pub class_type: TypeIndex,
    pub size: usize,
    pub wasted: usize,
    pub skips: Vec<SkipLayout>,
}

/// An opcode with every symbol replaced by its table index.
#[derive(Clone, Copy, Debug)]
enum Positional<'a> {
    SkipHeader(usize),
    SkipLabel(usize),
    Index(OpcodeTag, u32),
    Number(i32),
    Block(OpcodeTag, usize, &'a [u8]),
    Inline(&'a [u8]),
    Deferred(&'a PendingBuffer),
}

impl Positional<'_> {
    /// Encoded size; skip headers take their current reservation.
    fn size(&self, reserved: &[usize]) -> usize {
        1 + match *self {
            Positional::SkipHeader(slot) => reserved[slot],
            Positional::SkipLabel(_) => return 0,
            Positional::Index(_, value) => adaptive::encoded_len_u32(value),
            Positional::Number(value) => adaptive::encoded_len_i32(value),
            Positional::Block(_, width, bytes) => width + bytes.len(),
            Positional::Inline(bytes) => 1 + adaptive::encoded_len_u32(bytes.len() as u32) + bytes.len(),
            Positional::Deferred(_) => 1 + 8,
        }
    }
}

/// A body after layout, ready to emit.
#[derive(Debug)]
pub struct LaidOutBody<'a> {
    ops: Vec<Positional<'a>>,
    layout: ObjectLayout,
}

impl<'a> LaidOutBody<'a> {
    pub fn layout(&self) -> &ObjectLayout {
        &self.layout
    }

    pub fn into_layout(self) -> ObjectLayout {
        self.layout
    }

    /// Deferred buffers referenced by this body, in body order.
    pub fn deferred_buffers(&self) -> impl Iterator<Item = &'a PendingBuffer> + '_ {
        self.ops.iter().filter_map(|op| match op {
            Positional::Deferred(buffer) => Some(*buffer),
            _ => None,
        })
    }

    /// Write the positional body bytes.
    pub fn emit(&self) -> BinarizeResult<Vec<u8>> {
        let mut out = Vec::with_capacity(self.layout.size);
        for op in &self.ops {
            match *op {
                Positional::SkipHeader(slot) => {
                    let skip = &self.layout.skips[slot];
                    debug_assert_eq!(out.len(), skip.header_pos);
                    out.push(OpcodeTag::SkipHeader.byte());
                    adaptive::encode_u32_padded(skip.distance(), skip.reserved, &mut out)?;
                }
                Positional::SkipLabel(slot) => {
                    debug_assert_eq!(out.len(), self.layout.skips[slot].label_pos);
                }
                Positional::Index(tag, value) => {
                    out.push(tag.byte());
                    adaptive::encode_u32(value, &mut out);
                }
                Positional::Number(value) => {
                    out.push(OpcodeTag::DataAdaptiveNumber.byte());
                    adaptive::encode_i32(value, &mut out);
                }
                Positional::Block(tag, width, bytes) => {
                    out.push(tag.byte());
                    let len = bytes.len();
                    match width {
                        1 => out.push(len as u8),
                        2 => out.extend_from_slice(&(len as u16).to_ne_bytes()),
                        _ => out.extend_from_slice(&(len as u32).to_ne_bytes()),
                    }
                    out.extend_from_slice(bytes);
                }
                Positional::Inline(bytes) => {
                    out.push(OpcodeTag::DataInlineBuffer.byte());
                    out.push(inline_mode::EMBEDDED);
                    adaptive::encode_u32(bytes.len() as u32, &mut out);
                    out.extend_from_slice(bytes);
                }
                Positional::Deferred(buffer) => {
                    out.push(OpcodeTag::DataInlineBuffer.byte());
                    out.push(inline_mode::DEFERRED);
                    out.extend_from_slice(&buffer.checksum.to_ne_bytes());
                }
            }
        }
        debug_assert_eq!(out.len(), self.layout.size);
        Ok(out)
    }
}

fn block<'a>(tag: OpcodeTag, width: usize, bytes: &'a [u8]) -> BinarizeResult<Positional<'a>> {
    let max = match width {
        1 => usize::from(u8::MAX),
        2 => usize::from(u16::MAX),
        _ => u32::MAX as usize,
    };
    if bytes.len() > max {
        return Err(InvariantViolation::BlockTooLarge {
            width,
            len: bytes.len(),
        }
        .into());
    }
    Ok(Positional::Block(tag, width, bytes))
}

fn pointer(target: Option<ObjectHandle>, objects: usize) -> BinarizeResult<u32> {
    let index = match target {
        None => None,
        Some(handle) if (handle.0 as usize) < objects => Some(ExportIndex::new(handle.0)),
        Some(handle) => {
            return Err(InvariantViolation::DanglingHandle { handle, objects }.into());
        }
    };
    Ok(ExportIndex::to_pointer(index))
}

/// Walk positions with the given reservations; returns the body size and,
/// per skip slot, the header and label positions.
fn place(ops: &[Positional<'_>], reserved: &[usize]) -> (usize, Vec<(usize, usize)>) {
    let mut positions = vec![(0, 0); reserved.len()];
    let mut pos = 0;
    for op in ops {
        match *op {
            Positional::SkipHeader(slot) => positions[slot].0 = pos,
            Positional::SkipLabel(slot) => positions[slot].1 = pos,
            _ => {}
        }
        pos += op.size(reserved);
    }
    (pos, positions)
}

/// Lay out one body, interning every symbol it names.
///
/// `objects` is the number of objects in the save; object pointers must
/// address one of them.
pub fn lay_out<'a>(
    class_type: TypeIndex,
    ops: &'a [Opcode],
    tables: &mut TableBuilder,
    objects: usize,
) -> BinarizeResult<LaidOutBody<'a>> {
    let mut positional = Vec::with_capacity(ops.len());
    let mut slots: HashMap<SkipId, usize> = HashMap::new();
    let mut ids = Vec::new();
    let mut open: Vec<(SkipId, usize)> = Vec::new();

    for op in ops {
        let resolved = match op {
            Opcode::SkipHeader(id) => {
                if slots.contains_key(id) {
                    return Err(InvariantViolation::DuplicateSkip { id: *id }.into());
                }
                let slot = ids.len();
                ids.push(*id);
                slots.insert(*id, slot);
                open.push((*id, slot));
                Positional::SkipHeader(slot)
            }
            Opcode::SkipLabel(id) => match open.pop() {
                Some((top, slot)) if top == *id => Positional::SkipLabel(slot),
                Some((top, _)) if slots.contains_key(id) => {
                    return Err(InvariantViolation::ImproperNesting {
                        expected: top,
                        found: *id,
                    }
                    .into());
                }
                _ => return Err(InvariantViolation::UnmatchedLabel { id: *id }.into()),
            },
            Opcode::Property {
                class,
                name,
                value_type,
            } => {
                let index = tables.map_property(class, name, value_type)?;
                Positional::Index(OpcodeTag::Property, index.get())
            }
            Opcode::DataBlock1(bytes) => block(OpcodeTag::DataBlock1, 1, bytes)?,
            Opcode::DataBlock2(bytes) => block(OpcodeTag::DataBlock2, 2, bytes)?,
            Opcode::DataBlock4(bytes) => block(OpcodeTag::DataBlock4, 4, bytes)?,
            Opcode::DataTypeRef(type_name) => {
                Positional::Index(OpcodeTag::DataTypeRef, tables.map_type(type_name)?.get())
            }
            Opcode::DataName(name) => {
                Positional::Index(OpcodeTag::DataName, tables.map_name(name)?.get())
            }
            Opcode::DataObjectPointer(target) => {
                Positional::Index(OpcodeTag::DataObjectPointer, pointer(*target, objects)?)
            }
            Opcode::DataResourceRef(key) => {
                Positional::Index(OpcodeTag::DataResourceRef, tables.map_import(key)?.get())
            }
            Opcode::DataAdaptiveNumber(value) => Positional::Number(*value),
            Opcode::DataInlineBuffer(BufferRef::Inline(bytes)) => {
                crate::opcode::size_u32("inline buffer", bytes.len())?;
                Positional::Inline(bytes)
            }
            Opcode::DataInlineBuffer(BufferRef::Deferred(buffer)) => Positional::Deferred(buffer),
        };
        positional.push(resolved);
    }
    if let Some(&(id, _)) = open.last() {
        return Err(InvariantViolation::UnclosedSkip { id }.into());
    }

    let worst = vec![MAX_ENCODED_LEN; ids.len()];
    let (_, tentative) = place(&positional, &worst);

    let reserved = tentative
        .iter()
        .map(|&(header, label)| Ok(adaptive::encoded_len_u32(skip_distance(header, label)?)))
        .collect::<BinarizeResult<Vec<usize>>>()?;
    let (size, placed) = place(&positional, &reserved);

    let mut skips = Vec::with_capacity(ids.len());
    for (slot, &(header_pos, label_pos)) in placed.iter().enumerate() {
        let needed = adaptive::encoded_len_u32(skip_distance(header_pos, label_pos)?);
        debug_assert!(needed <= reserved[slot]);
        if needed > reserved[slot] {
            return Err(InvariantViolation::ReservationExceeded {
                id: ids[slot],
                reserved: reserved[slot],
                needed,
            }
            .into());
        }
        skips.push(SkipLayout {
            id: ids[slot].0,
            header_pos,
            label_pos,
            reserved: reserved[slot],
        });
    }
    let wasted = skips.iter().map(SkipLayout::wasted).sum();
    if !skips.is_empty() {
        debug!(size, skips = skips.len(), wasted, "body laid out");
    }

    Ok(LaidOutBody {
        ops: positional,
        layout: ObjectLayout {
            class_type,
            size,
            wasted,
            skips,
        },
    })
}
