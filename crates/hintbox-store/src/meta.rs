//! Meta stores: typed item containers at file, movie, and track level.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use hintbox_core::{Error, ItemId, Result};

/// Where a meta edit applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetaScope {
    /// Root (file-level) meta.
    File,
    /// Movie-level meta.
    Movie,
    /// Meta of the given track.
    Track(hintbox_core::TrackId),
}

/// One resource stored in a meta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaItem {
    pub id: ItemId,
    pub name: Option<String>,
    pub mime_type: Option<String>,
    pub encoding: Option<String>,
    /// Payload; `None` when the item refers to the enclosing file itself.
    pub data: Option<Bytes>,
}

impl MetaItem {
    /// Whether this item is a self-reference to the enclosing file.
    #[must_use]
    pub fn is_self_reference(&self) -> bool {
        self.data.is_none()
    }
}

/// A meta container: a four-character type, items, an optional primary item,
/// and optional XML data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetaStore {
    meta_type: Option<[u8; 4]>,
    items: Vec<MetaItem>,
    primary: Option<ItemId>,
    xml: Option<Bytes>,
    xml_binary: bool,
    next_item_id: u32,
}

impl MetaStore {
    /// The four-character meta type, if set.
    #[must_use]
    pub fn meta_type(&self) -> Option<[u8; 4]> {
        self.meta_type
    }

    /// Set or clear (with `None`) the meta type. Clearing drops all content.
    pub fn set_meta_type(&mut self, meta_type: Option<[u8; 4]>) {
        self.meta_type = meta_type;
        if meta_type.is_none() {
            self.items.clear();
            self.primary = None;
            self.xml = None;
            self.xml_binary = false;
        }
    }

    #[must_use]
    pub fn items(&self) -> &[MetaItem] {
        &self.items
    }

    #[must_use]
    pub fn primary_item(&self) -> Option<ItemId> {
        self.primary
    }

    /// Add an item, returning its assigned ID.
    pub fn add_item(
        &mut self,
        name: Option<String>,
        mime_type: Option<String>,
        encoding: Option<String>,
        data: Option<Bytes>,
    ) -> ItemId {
        self.next_item_id += 1;
        let id = ItemId::new(self.next_item_id);
        self.items.push(MetaItem {
            id,
            name,
            mime_type,
            encoding,
            data,
        });
        id
    }

    /// Remove an item by ID.
    pub fn remove_item(&mut self, id: ItemId) -> Result<()> {
        let pos = self
            .items
            .iter()
            .position(|it| it.id == id)
            .ok_or_else(|| Error::InvalidRequest(format!("no meta item with ID {id}")))?;
        self.items.remove(pos);
        if self.primary == Some(id) {
            self.primary = None;
        }
        Ok(())
    }

    /// Mark an item as the primary resource.
    pub fn set_primary_item(&mut self, id: ItemId) -> Result<()> {
        if !self.items.iter().any(|it| it.id == id) {
            return Err(Error::InvalidRequest(format!("no meta item with ID {id}")));
        }
        self.primary = Some(id);
        Ok(())
    }

    /// Look up an item by ID.
    #[must_use]
    pub fn item(&self, id: ItemId) -> Option<&MetaItem> {
        self.items.iter().find(|it| it.id == id)
    }

    /// Set the XML payload (textual or binary).
    pub fn set_xml(&mut self, data: Bytes, binary: bool) {
        self.xml = Some(data);
        self.xml_binary = binary;
    }

    /// Remove the XML payload.
    pub fn remove_xml(&mut self) {
        self.xml = None;
        self.xml_binary = false;
    }

    /// The XML payload and whether it is binary.
    #[must_use]
    pub fn xml(&self) -> Option<(&Bytes, bool)> {
        self.xml.as_ref().map(|x| (x, self.xml_binary))
    }

    /// Whether the store holds any content worth persisting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.meta_type.is_none() && self.items.is_empty() && self.xml.is_none()
    }
}
