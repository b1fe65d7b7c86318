//! Shared fixtures for unit tests across the crate.

use std::path::{Path, PathBuf};

use crate::config::GeneratorConfig;
use crate::emit::EmitContext;
use crate::error::SdkGenError;
use crate::extract::Extractor;
use crate::extract::pairing::pair_types;
use crate::extract::routes::route_bindings;
use crate::file::go_file::GoFile;
use crate::model::{ResourceModel, SharedModel};
use crate::resolve::{DistributionMode, ProjectLayout, SdkTarget};

pub const ROOT: &str = "/srv/shop";
pub const MODULE: &str = "example.com/shop";

/// Layout of a project rooted at [`ROOT`] with module [`MODULE`].
pub fn layout(config: &GeneratorConfig) -> ProjectLayout {
    ProjectLayout::from_parts(Path::new(ROOT), MODULE, None, config)
}

pub fn local_target(config: &GeneratorConfig) -> SdkTarget {
    SdkTarget::resolve(&layout(config), config, DistributionMode::Local)
        .expect("local mode needs no extra settings")
}

/// Extracts the shared base model from in-memory source.
pub fn shared(source: &str) -> Result<SharedModel, SdkGenError> {
    let config = GeneratorConfig::default();
    let layout = layout(&config);
    let path = PathBuf::from(ROOT).join("api/typespec/base.go");
    let file = GoFile::from_source(&path, source.to_string())?;
    let extract = Extractor::new(&layout, &config).extract_type_file(&file, None)?;

    Ok(SharedModel {
        source: path,
        constants: extract.constants,
        types: extract.types,
        cache: extract.cache,
    })
}

/// Builds a resource model named after `stem` from type and route source.
pub fn resource_with(
    stem: &str,
    types: &str,
    routes: &str,
    shared: Option<&SharedModel>,
) -> Result<ResourceModel, SdkGenError> {
    let config = GeneratorConfig::default();
    let layout = layout(&config);
    let type_path = PathBuf::from(ROOT).join(format!("api/typespec/{stem}type/{stem}.go"));
    let route_path = PathBuf::from(ROOT).join(format!("api/rest/{stem}/{stem}.go"));

    let file = GoFile::from_source(&type_path, types.to_string())?;
    let extract = Extractor::new(&layout, &config).extract_type_file(&file, shared)?;
    let route_file = GoFile::from_source(&route_path, routes.to_string())?;
    let pairing = pair_types(extract.types, route_bindings(&route_path, &route_file.functions())?)?;

    Ok(ResourceModel {
        source: type_path,
        package: extract.package,
        resource: crate::naming::upper_camel(stem),
        file_stem: stem.to_string(),
        imports: extract.imports,
        constants: extract.constants,
        general: pairing.general,
        pairs: pairing.pairs,
        cache: extract.cache,
    })
}

pub fn resource(types: &str, routes: &str) -> Result<ResourceModel, SdkGenError> {
    resource_with("widget", types, routes, None)
}

/// Owns everything an [`EmitContext`] borrows.
pub struct EmitFixture {
    pub config: GeneratorConfig,
    pub target: SdkTarget,
    pub shared: Option<SharedModel>,
}

impl EmitFixture {
    pub fn new(shared: Option<SharedModel>) -> Self {
        let config = GeneratorConfig::default();
        let target = local_target(&config);
        Self {
            config,
            target,
            shared,
        }
    }

    pub fn ctx(&self) -> EmitContext<'_> {
        EmitContext {
            target: &self.target,
            config: &self.config,
            shared: self.shared.as_ref(),
        }
    }
}

/// A widget resource exercising constants, nesting, shared types and both methods.
pub const WIDGET_TYPES: &str = r#"package widgettype

import "example.com/shop/api/typespec"

type Status int

const (
	StatusDraft Status = iota
	StatusLive
	StatusRetired
)

const MaxPageSize = 100

// Widget is a sellable item.
type Widget struct {
	ID     int64             `json:"id"`
	Name   string            `json:"name"` // display name
	Status Status            `json:"status"`
	Labels map[string]string `json:"labels"`
}

type FetchWidgetRequest struct {
	ID int64 `json:"id" form:"id"`
}

type FetchWidgetResponse struct {
	Widget
	Parts []struct {
		Sku   string `json:"sku"`
		Count int    `json:"count"`
	} `json:"parts"`
}

type CreateWidgetRequest struct {
	Name  string   `json:"name" binding:"required"`
	Tags  []string `json:"tags"`
	Owner *Widget  `json:"owner"`
}

type CreateWidgetResponse struct {
	typespec.Pagination
	Widgets []*Widget `json:"widgets"`
}
"#;

pub const WIDGET_ROUTES: &str = r#"package widget

// FetchWidget returns one widget.
// @router /widget/info [get]
func FetchWidget(c *Context) {}

// @router /widget/create [post]
func CreateWidget(c *Context) {}
"#;

pub const BASE_TYPES: &str = r#"package typespec

type Pagination struct {
	Page     int `json:"page" form:"page"`
	PageSize int `json:"page_size" form:"page_size"`
}
"#;

/// The widget fixture resolved against [`BASE_TYPES`].
pub fn widget() -> (ResourceModel, SharedModel) {
    let base = shared(BASE_TYPES).expect("base fixture extracts");
    let widget = resource_with("widget", WIDGET_TYPES, WIDGET_ROUTES, Some(&base))
        .expect("widget fixture extracts");
    (widget, base)
}
