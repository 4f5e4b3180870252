use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetOrigin {
    Preset,
    Upload,
    Generated,
}

impl AssetOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preset => "preset",
            Self::Upload => "upload",
            Self::Generated => "generated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetCategory {
    Face,
    Cloth,
    Result,
}

impl AssetCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Face => "face",
            Self::Cloth => "cloth",
            Self::Result => "result",
        }
    }
}

/// An image the wizard can hand around: either an inline `data:` URL or a
/// remote HTTP(S) URL. Assets never change after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAsset {
    id: String,
    url: String,
    origin: AssetOrigin,
    category: AssetCategory,
}

impl ImageAsset {
    pub fn with_id(
        id: impl Into<String>,
        url: impl Into<String>,
        origin: AssetOrigin,
        category: AssetCategory,
    ) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            origin,
            category,
        }
    }

    pub fn upload(url: impl Into<String>, category: AssetCategory) -> Self {
        Self::with_id(
            format!("upload-{}", Uuid::new_v4()),
            url,
            AssetOrigin::Upload,
            category,
        )
    }

    pub fn generated(url: impl Into<String>, category: AssetCategory) -> Self {
        let prefix = match category {
            AssetCategory::Result => "res",
            AssetCategory::Face | AssetCategory::Cloth => "gen",
        };
        Self::with_id(
            format!("{prefix}-{}", Uuid::new_v4()),
            url,
            AssetOrigin::Generated,
            category,
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn origin(&self) -> AssetOrigin {
        self.origin
    }

    pub fn category(&self) -> AssetCategory {
        self.category
    }

    pub fn is_inline(&self) -> bool {
        self.url.starts_with("data:")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PresetSpec {
    pub id: &'static str,
    pub label: &'static str,
    pub url: &'static str,
}

pub const PRESET_FACES: &[PresetSpec] = &[
    PresetSpec {
        id: "p1",
        label: "Model A",
        url: "https://images.unsplash.com/photo-1494790108377-be9c29b29330?auto=format&fit=crop&w=800&q=80",
    },
    PresetSpec {
        id: "p2",
        label: "Model B",
        url: "https://images.unsplash.com/photo-1507003211169-0a1dd7228f2d?auto=format&fit=crop&w=800&q=80",
    },
    PresetSpec {
        id: "p3",
        label: "Model C",
        url: "https://images.unsplash.com/photo-1534528741775-53994a69daeb?auto=format&fit=crop&w=800&q=80",
    },
];

pub const PRESET_CLOTHS: &[PresetSpec] = &[
    PresetSpec {
        id: "c1",
        label: "White T-shirt",
        url: "https://images.unsplash.com/photo-1521572163474-6864f9cf17ab?auto=format&fit=crop&w=800&q=80",
    },
    PresetSpec {
        id: "c2",
        label: "Leather jacket",
        url: "https://images.unsplash.com/photo-1551028919-ac66c9a3d683?auto=format&fit=crop&w=800&q=80",
    },
    PresetSpec {
        id: "c3",
        label: "Denim jacket",
        url: "https://images.unsplash.com/photo-1591047139829-d91aecb6caea?auto=format&fit=crop&w=800&q=80",
    },
];

pub fn presets(category: AssetCategory) -> &'static [PresetSpec] {
    match category {
        AssetCategory::Face => PRESET_FACES,
        AssetCategory::Cloth => PRESET_CLOTHS,
        AssetCategory::Result => &[],
    }
}

pub fn preset_asset(category: AssetCategory, id: &str) -> Option<ImageAsset> {
    presets(category)
        .iter()
        .find(|spec| spec.id.eq_ignore_ascii_case(id.trim()))
        .map(|spec| ImageAsset::with_id(spec.id, spec.url, AssetOrigin::Preset, category))
}

#[cfg(test)]
mod tests {
    use super::{preset_asset, AssetCategory, AssetOrigin, ImageAsset};

    #[test]
    fn generated_ids_are_prefixed_and_unique() {
        let a = ImageAsset::generated("data:image/png;base64,AA", AssetCategory::Result);
        let b = ImageAsset::generated("data:image/png;base64,AA", AssetCategory::Result);
        assert!(a.id().starts_with("res-"));
        assert_ne!(a.id(), b.id());

        let cloth = ImageAsset::generated("data:image/png;base64,AA", AssetCategory::Cloth);
        assert!(cloth.id().starts_with("gen-"));
        assert_eq!(cloth.origin(), AssetOrigin::Generated);
    }

    #[test]
    fn preset_lookup_is_scoped_by_category() {
        let face = preset_asset(AssetCategory::Face, "P2").unwrap();
        assert_eq!(face.id(), "p2");
        assert_eq!(face.origin(), AssetOrigin::Preset);
        assert!(!face.is_inline());
        assert!(preset_asset(AssetCategory::Cloth, "p2").is_none());
        assert!(preset_asset(AssetCategory::Result, "p1").is_none());
    }

    #[test]
    fn asset_serializes_with_lowercase_tags() -> anyhow::Result<()> {
        let asset = ImageAsset::with_id("c1", "https://x/y.png", AssetOrigin::Preset, AssetCategory::Cloth);
        let value = serde_json::to_value(&asset)?;
        assert_eq!(value["origin"], "preset");
        assert_eq!(value["category"], "cloth");
        Ok(())
    }
}
