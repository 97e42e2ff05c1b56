/// Vertex and index arrays grouped into items, so that one run of text can
/// be redrawn or erased in place. Indices are stored absolute.

use crate::error::VertexFormatError;
use bytemuck::Pod;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Float,
    Double,
}

impl AttributeType {
    fn from_char(c: char) -> Result<Self, VertexFormatError> {
        Ok(match c {
            'b' => AttributeType::Byte,
            'B' => AttributeType::UnsignedByte,
            's' => AttributeType::Short,
            'S' => AttributeType::UnsignedShort,
            'i' => AttributeType::Int,
            'I' => AttributeType::UnsignedInt,
            'f' => AttributeType::Float,
            'd' => AttributeType::Double,
            other => return Err(VertexFormatError::UnknownType(other)),
        })
    }

    pub fn size(self) -> usize {
        match self {
            AttributeType::Byte | AttributeType::UnsignedByte => 1,
            AttributeType::Short | AttributeType::UnsignedShort => 2,
            AttributeType::Int | AttributeType::UnsignedInt | AttributeType::Float => 4,
            AttributeType::Double => 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexAttribute {
    pub name: String,
    pub count: usize,
    pub kind: AttributeType,
    /// Byte offset inside one vertex.
    pub offset: usize,
}

/// Parsed `name:<count><type>` list, e.g. `"vertex:3f,tex_coord:2f"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexFormat {
    pub attributes: Vec<VertexAttribute>,
    pub stride: usize,
}

impl FromStr for VertexFormat {
    type Err = VertexFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut attributes = Vec::new();
        let mut offset = 0;
        for part in s.split(',').map(str::trim) {
            let malformed = || VertexFormatError::Malformed(part.to_string());
            let (name, layout) = part.split_once(':').ok_or_else(malformed)?;
            let kind_char = layout.chars().last().ok_or_else(malformed)?;
            let count: usize = layout[..layout.len() - kind_char.len_utf8()]
                .parse()
                .map_err(|_| malformed())?;
            if name.is_empty() || !(1..=4).contains(&count) {
                return Err(malformed());
            }
            let kind = AttributeType::from_char(kind_char)?;
            attributes.push(VertexAttribute { name: name.to_string(), count, kind, offset });
            offset += count * kind.size();
        }
        Ok(VertexFormat { attributes, stride: offset })
    }
}

/// A plain-data vertex with a textual layout description.
pub trait Vertex: Pod {
    const FORMAT: &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VertexItem {
    pub vstart: usize,
    pub vcount: usize,
    pub istart: usize,
    pub icount: usize,
}

#[derive(Debug, Clone)]
pub struct VertexBuffer<V> {
    vertices: Vec<V>,
    indices: Vec<u32>,
    items: Vec<VertexItem>,
}

impl<V: Vertex> Default for VertexBuffer<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Vertex> VertexBuffer<V> {
    pub fn new() -> Self {
        Self { vertices: Vec::new(), indices: Vec::new(), items: Vec::new() }
    }

    pub fn format(&self) -> Result<VertexFormat, VertexFormatError> {
        V::FORMAT.parse()
    }

    /// Append an item. `indices` are relative to the first of `vertices`.
    pub fn push_back(&mut self, vertices: &[V], indices: &[u32]) -> usize {
        self.insert(self.items.len(), vertices, indices)
    }

    /// Insert an item at position `index` in the item list. Its data is
    /// appended to the arrays.
    pub fn insert(&mut self, index: usize, vertices: &[V], indices: &[u32]) -> usize {
        let index = index.min(self.items.len());
        let item = VertexItem {
            vstart: self.vertices.len(),
            vcount: vertices.len(),
            istart: self.indices.len(),
            icount: indices.len(),
        };
        self.append(vertices, indices);
        self.items.insert(index, item);
        index
    }

    /// Append to the last item, or start one when the last item's data is
    /// not at the end of the arrays.
    pub fn extend_last(&mut self, vertices: &[V], indices: &[u32]) {
        let at_tail = self.items.last().is_some_and(|last| {
            last.vstart + last.vcount == self.vertices.len()
                && last.istart + last.icount == self.indices.len()
        });
        if !at_tail {
            self.push_back(vertices, indices);
            return;
        }
        self.append(vertices, indices);
        if let Some(last) = self.items.last_mut() {
            last.vcount += vertices.len();
            last.icount += indices.len();
        }
    }

    fn append(&mut self, vertices: &[V], indices: &[u32]) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(vertices);
        self.indices.extend(indices.iter().map(|i| i + base));
    }

    /// Remove an item with its vertices and indices; later data shifts
    /// down and the remaining indices are rebased.
    pub fn erase(&mut self, index: usize) -> Option<VertexItem> {
        if index >= self.items.len() {
            return None;
        }
        let item = self.items.remove(index);
        self.vertices.drain(item.vstart..item.vstart + item.vcount);
        self.indices.drain(item.istart..item.istart + item.icount);
        let (vcount, icount) = (item.vcount as u32, item.icount);
        for i in &mut self.indices {
            if *i >= item.vstart as u32 + vcount {
                *i -= vcount;
            }
        }
        for other in &mut self.items {
            if other.vstart > item.vstart {
                other.vstart -= item.vcount;
            }
            if other.istart > item.istart {
                other.istart -= icount;
            }
        }
        Some(item)
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.items.clear();
    }

    pub fn vertices(&self) -> &[V] {
        &self.vertices
    }

    pub fn vertices_mut(&mut self) -> &mut [V] {
        &mut self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn items(&self) -> &[VertexItem] {
        &self.items
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytemuck::Zeroable;

    #[repr(C)]
    #[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, Zeroable)]
    struct P(f32, f32);

    impl Vertex for P {
        const FORMAT: &'static str = "position:2f";
    }

    fn tri(x: f32) -> [P; 3] {
        [P(x, 0.0), P(x, 1.0), P(x, 2.0)]
    }

    #[test]
    fn test_parse_glyph_format() {
        let f: VertexFormat = "vertex:3f,tex_coord:2f,color:4f,ashift:1f,agamma:1f".parse().unwrap();
        assert_eq!(f.stride, 44);
        let offsets: Vec<_> = f.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 20, 36, 40]);
        assert_eq!(f.attributes[2].name, "color");
    }

    #[test]
    fn test_parse_mixed_types() {
        let f: VertexFormat = "pos:2s, color:4B, weight:1d".parse().unwrap();
        assert_eq!(f.stride, 4 + 4 + 8);
        assert_eq!(f.attributes[1].kind, AttributeType::UnsignedByte);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            "vertex:3q".parse::<VertexFormat>(),
            Err(VertexFormatError::UnknownType('q'))
        );
        assert!(matches!("vertex3f".parse::<VertexFormat>(), Err(VertexFormatError::Malformed(_))));
        assert!(matches!("vertex:9f".parse::<VertexFormat>(), Err(VertexFormatError::Malformed(_))));
        assert!(matches!(":2f".parse::<VertexFormat>(), Err(VertexFormatError::Malformed(_))));
    }

    #[test]
    fn test_push_back_offsets_indices() {
        let mut buf = VertexBuffer::<P>::new();
        buf.push_back(&tri(0.0), &[0, 1, 2]);
        buf.push_back(&tri(1.0), &[0, 1, 2]);
        assert_eq!(buf.indices(), &[0, 1, 2, 3, 4, 5]);
        assert_eq!(buf.items()[1], VertexItem { vstart: 3, vcount: 3, istart: 3, icount: 3 });
        assert_eq!(buf.format().unwrap().stride, 8);
    }

    #[test]
    fn test_insert_orders_items_not_data() {
        let mut buf = VertexBuffer::<P>::new();
        buf.push_back(&tri(0.0), &[0, 1, 2]);
        buf.insert(0, &tri(1.0), &[2, 1, 0]);
        assert_eq!(buf.items()[0].vstart, 3);
        assert_eq!(buf.items()[1].vstart, 0);
        assert_eq!(&buf.indices()[3..], &[5, 4, 3]);
    }

    #[test]
    fn test_erase_rebases() {
        let mut buf = VertexBuffer::<P>::new();
        buf.push_back(&tri(0.0), &[0, 1, 2]);
        buf.push_back(&tri(1.0), &[0, 1, 2]);
        buf.push_back(&tri(2.0), &[2, 1, 0]);
        let removed = buf.erase(1).unwrap();
        assert_eq!(removed.vstart, 3);
        assert_eq!(buf.vertices().len(), 6);
        assert_eq!(buf.vertices()[3], P(2.0, 0.0));
        assert_eq!(buf.indices(), &[0, 1, 2, 5, 4, 3]);
        assert_eq!(buf.items()[1], VertexItem { vstart: 3, vcount: 3, istart: 3, icount: 3 });
        assert!(buf.erase(5).is_none());
    }

    #[test]
    fn test_extend_last() {
        let mut buf = VertexBuffer::<P>::new();
        buf.extend_last(&tri(0.0), &[0, 1, 2]);
        buf.extend_last(&tri(1.0), &[0, 1, 2]);
        assert_eq!(buf.items().len(), 1);
        assert_eq!(buf.items()[0].vcount, 6);
        assert_eq!(buf.indices(), &[0, 1, 2, 3, 4, 5]);

        // Data of the last item is no longer at the tail.
        buf.push_back(&tri(2.0), &[0, 1, 2]);
        buf.insert(0, &tri(3.0), &[0, 1, 2]);
        buf.extend_last(&tri(4.0), &[0, 1, 2]);
        assert_eq!(buf.items().len(), 4);
    }

    #[test]
    fn test_clear_and_bytes() {
        let mut buf = VertexBuffer::<P>::new();
        buf.push_back(&tri(0.0), &[0, 1, 2]);
        assert_eq!(buf.vertex_bytes().len(), 3 * 8);
        assert_eq!(buf.index_bytes().len(), 3 * 4);
        buf.clear();
        assert!(buf.is_empty());
        assert!(buf.vertices().is_empty());
    }
}
