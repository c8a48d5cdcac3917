//! Structured comparison of two `AndroidManifest.xml` documents
//!
//! Only a fixed subset of the manifest schema is understood: the root
//! `<manifest>` element, `<application>` and its components,
//! `<uses-sdk>`, `<supports-screens>`, `<compatible-screens>`, and the
//! named-entity tags (`<permission>`, `<uses-permission>`, ...). Everything
//! else in the document is ignored.
//!
//! Every record describes its comparable fields once, in a table of
//! [`Field`]s. Diffing two records walks that table in order, so the
//! report layout follows directly from the table layout.

use std::collections::BTreeSet;
use std::fmt;

use roxmltree::{Document, Node};

use crate::errors::ParseError;

/// Namespace of every `android:`-prefixed attribute
pub const ANDROID_NAMESPACE: &str = "http://schemas.android.com/apk/res/android";

const TAG_MANIFEST: &str = "manifest";
const TAG_APPLICATION: &str = "application";
const TAG_PERMISSION: &str = "permission";
const TAG_SUPPORTS_GL_TEXTURE: &str = "supports-gl-texture";
const TAG_COMPATIBLE_SCREENS: &str = "compatible-screens";
const TAG_SUPPORTS_SCREENS: &str = "supports-screens";
const TAG_USES_CONFIGURATION: &str = "uses-configuration";
const TAG_USES_FEATURE: &str = "uses-feature";
const TAG_USES_PERMISSION: &str = "uses-permission";
const TAG_USES_PERMISSION_SDK_23: &str = "uses-permission-sdk-23";
const TAG_USES_SDK: &str = "uses-sdk";
const TAG_SCREEN: &str = "screen";

/// Sentinel messages returned instead of a diff when a manifest is unavailable
pub const NO_MANIFESTS: &str = "Cannot get manifests";
pub const NO_PREVIOUS_MANIFEST: &str = "Cannot get previous version's manifest";
pub const NO_CURRENT_MANIFEST: &str = "Cannot get current version's manifest";

/// One comparable field of a manifest record
pub(crate) enum Field<T> {
    /// A single optional attribute value, reported as Was/Now
    Scalar(&'static str, fn(&T) -> Option<&str>),
    /// A set of names, reported as Added/Removed
    Set(&'static str, fn(&T) -> &BTreeSet<String>),
}

/// A manifest record that can be diffed against a peer of the same type
pub(crate) trait Section: Sized + 'static {
    const FIELDS: &'static [Field<Self>];

    fn diff_into(&self, other: &Self, lines: &mut Vec<String>) {
        for field in Self::FIELDS {
            match field {
                Field::Scalar(label, get) => compare_scalar(label, get(self), get(other), lines),
                Field::Set(label, get) => compare_set(label, get(self), get(other), lines),
            }
        }
    }
}

fn compare_scalar(label: &str, lhs: Option<&str>, rhs: Option<&str>, lines: &mut Vec<String>) {
    if lhs == rhs {
        return;
    }
    lines.push(format!("Different {label}:"));
    lines.push(format!("\tWas: {}", lhs.unwrap_or("None")));
    lines.push(format!("\tNow: {}", rhs.unwrap_or("None")));
}

fn compare_set(
    label: &str,
    lhs: &BTreeSet<String>,
    rhs: &BTreeSet<String>,
    lines: &mut Vec<String>,
) {
    if lhs == rhs {
        return;
    }
    lines.push(format!("Different {label}:"));

    let added: Vec<&str> = rhs.difference(lhs).map(String::as_str).collect();
    let removed: Vec<&str> = lhs.difference(rhs).map(String::as_str).collect();
    if !added.is_empty() {
        lines.push(format!("\tAdded: {}", added.join(" ")));
    }
    if !removed.is_empty() {
        lines.push(format!("\tRemoved: {}", removed.join(" ")));
    }
}

/// Both present: diff them. Exactly one present: ask for a manual check.
fn compare_optional<T: Section>(
    tag: &'static str,
    lhs: Option<&T>,
    rhs: Option<&T>,
    diff: &mut ManifestDiff,
) {
    match (lhs, rhs) {
        (Some(lhs), Some(rhs)) => lhs.diff_into(rhs, &mut diff.lines),
        (None, None) => {}
        _ => diff.manual_checks.push(tag),
    }
}

fn android_attribute(node: Node<'_, '_>, name: &str) -> Option<String> {
    node.attribute((ANDROID_NAMESPACE, name)).map(str::to_owned)
}

fn first_child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.has_tag_name(tag))
}

/// Collect `android:name` of every matching element; elements without a name are skipped
fn collect_names<'a, 'input: 'a>(
    nodes: impl Iterator<Item = Node<'a, 'input>>,
    tag: &str,
) -> BTreeSet<String> {
    nodes
        .filter(|n| n.is_element() && n.has_tag_name(tag))
        .filter_map(|n| android_attribute(n, "name"))
        .filter(|name| !name.is_empty())
        .collect()
}

/// The `<application>` element, reduced to the names of its components
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Application {
    pub services: BTreeSet<String>,
    pub activities: BTreeSet<String>,
    pub activity_aliases: BTreeSet<String>,
    pub providers: BTreeSet<String>,
    pub receivers: BTreeSet<String>,
    pub meta_datas: BTreeSet<String>,
}

impl Application {
    fn from_node(node: Node<'_, '_>) -> Self {
        // Components are direct children of <application>
        let names = |tag| collect_names(node.children(), tag);
        Self {
            services: names("service"),
            activities: names("activity"),
            activity_aliases: names("activity-alias"),
            providers: names("provider"),
            receivers: names("receiver"),
            meta_datas: names("meta-data"),
        }
    }
}

impl Section for Application {
    const FIELDS: &'static [Field<Self>] = &[
        Field::Set("services", |a| &a.services),
        Field::Set("activities", |a| &a.activities),
        Field::Set("activity-aliases", |a| &a.activity_aliases),
        Field::Set("content providers", |a| &a.providers),
        Field::Set("broadcast receivers", |a| &a.receivers),
        Field::Set("meta-datas", |a| &a.meta_datas),
    ];
}

/// `<uses-sdk>`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsesSdk {
    pub min_sdk: Option<String>,
    pub target_sdk: Option<String>,
    pub max_sdk: Option<String>,
}

impl UsesSdk {
    fn from_node(node: Node<'_, '_>) -> Self {
        Self {
            min_sdk: android_attribute(node, "minSdkVersion"),
            target_sdk: android_attribute(node, "targetSdkVersion"),
            max_sdk: android_attribute(node, "maxSdkVersion"),
        }
    }
}

impl Section for UsesSdk {
    const FIELDS: &'static [Field<Self>] = &[
        Field::Scalar("min sdk", |s| s.min_sdk.as_deref()),
        Field::Scalar("target sdk", |s| s.target_sdk.as_deref()),
        Field::Scalar("max sdk", |s| s.max_sdk.as_deref()),
    ];
}

/// `<supports-screens>`. Values are kept as written in the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupportsScreens {
    pub resizeable: Option<String>,
    pub small_screens: Option<String>,
    pub normal_screens: Option<String>,
    pub large_screens: Option<String>,
    pub xlarge_screens: Option<String>,
    pub any_density: Option<String>,
    pub requires_smallest_width_dp: Option<String>,
    pub compatible_width_limit_dp: Option<String>,
    pub largest_width_limit_dp: Option<String>,
}

impl SupportsScreens {
    fn from_node(node: Node<'_, '_>) -> Self {
        Self {
            resizeable: android_attribute(node, "resizeable"),
            small_screens: android_attribute(node, "smallScreens"),
            normal_screens: android_attribute(node, "normalScreens"),
            large_screens: android_attribute(node, "largeScreens"),
            xlarge_screens: android_attribute(node, "xlargeScreens"),
            any_density: android_attribute(node, "anyDensity"),
            requires_smallest_width_dp: android_attribute(node, "requiresSmallestWidthDp"),
            compatible_width_limit_dp: android_attribute(node, "compatibleWidthLimitDp"),
            largest_width_limit_dp: android_attribute(node, "largestWidthLimitDp"),
        }
    }
}

impl Section for SupportsScreens {
    const FIELDS: &'static [Field<Self>] = &[
        Field::Scalar("resizable", |s| s.resizeable.as_deref()),
        Field::Scalar("smallScreens", |s| s.small_screens.as_deref()),
        Field::Scalar("normalScreens", |s| s.normal_screens.as_deref()),
        Field::Scalar("largeScreens", |s| s.large_screens.as_deref()),
        Field::Scalar("xlargeScreens", |s| s.xlarge_screens.as_deref()),
        Field::Scalar("anyDensity", |s| s.any_density.as_deref()),
        Field::Scalar("requiresSmallestWidthDp", |s| {
            s.requires_smallest_width_dp.as_deref()
        }),
        Field::Scalar("compatibleWidthLimitDp", |s| {
            s.compatible_width_limit_dp.as_deref()
        }),
        Field::Scalar("largestWidthLimitDp", |s| s.largest_width_limit_dp.as_deref()),
    ];
}

/// `<compatible-screens>`, one `size-density` entry per `<screen>`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompatibleScreens {
    pub screens: BTreeSet<String>,
}

impl CompatibleScreens {
    fn from_node(node: Node<'_, '_>) -> Self {
        let screens = node
            .children()
            .filter(|n| n.is_element() && n.has_tag_name(TAG_SCREEN))
            .map(|screen| {
                let size = android_attribute(screen, "screenSize");
                let density = android_attribute(screen, "screenDensity");
                format!(
                    "{}-{}",
                    size.as_deref().unwrap_or("None"),
                    density.as_deref().unwrap_or("None")
                )
            })
            .collect();
        Self { screens }
    }
}

impl Section for CompatibleScreens {
    const FIELDS: &'static [Field<Self>] = &[Field::Set(TAG_COMPATIBLE_SCREENS, |c| &c.screens)];
}

/// The root `<manifest>` element and everything below it that we compare
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestDocument {
    pub package: String,
    pub shared_user_id: Option<String>,
    pub shared_user_label: Option<String>,
    pub version_code: Option<String>,
    pub version_name: Option<String>,
    pub install_location: Option<String>,

    pub permissions: BTreeSet<String>,
    pub uses_features: BTreeSet<String>,
    pub uses_permissions: BTreeSet<String>,
    pub uses_permissions_sdk_23: BTreeSet<String>,
    pub supports_gl_texture: BTreeSet<String>,

    pub uses_sdk: Option<UsesSdk>,
    pub supports_screens: Option<SupportsScreens>,
    pub compatible_screens: Option<CompatibleScreens>,
    pub application: Application,

    pub has_uses_configuration: bool,
}

impl Section for ManifestDocument {
    const FIELDS: &'static [Field<Self>] = &[
        Field::Scalar("package", |m| Some(m.package.as_str())),
        Field::Scalar("sharedUserId", |m| m.shared_user_id.as_deref()),
        Field::Scalar("sharedUserLabel", |m| m.shared_user_label.as_deref()),
        Field::Scalar("versionCode", |m| m.version_code.as_deref()),
        Field::Scalar("versionName", |m| m.version_name.as_deref()),
        Field::Scalar("installLocation", |m| m.install_location.as_deref()),
        Field::Set(TAG_PERMISSION, |m| &m.permissions),
        Field::Set(TAG_USES_FEATURE, |m| &m.uses_features),
        Field::Set(TAG_USES_PERMISSION, |m| &m.uses_permissions),
        Field::Set(TAG_USES_PERMISSION_SDK_23, |m| &m.uses_permissions_sdk_23),
        Field::Set(TAG_SUPPORTS_GL_TEXTURE, |m| &m.supports_gl_texture),
    ];
}

impl ManifestDocument {
    /// Parse a decoded (textual) manifest, as printed by `apkanalyzer manifest print`
    pub fn parse(xml: &str) -> Result<Self, ParseError> {
        let document = Document::parse(xml)?;
        Self::from_node(document.root_element())
    }

    fn from_node(node: Node<'_, '_>) -> Result<Self, ParseError> {
        let tag = node.tag_name().name();
        if tag != TAG_MANIFEST {
            return Err(ParseError::UnexpectedRootTag {
                expected: TAG_MANIFEST,
                found: tag.to_owned(),
            });
        }

        // aapt writes `package` without a namespace; accept the prefixed form too
        let package = node
            .attribute("package")
            .map(str::to_owned)
            .or_else(|| android_attribute(node, "package"))
            .ok_or(ParseError::MissingAttribute {
                element: TAG_MANIFEST,
                attribute: "package",
            })?;

        let application = first_child(node, TAG_APPLICATION)
            .map(Application::from_node)
            .ok_or(ParseError::MissingElement {
                parent: TAG_MANIFEST,
                element: TAG_APPLICATION,
            })?;

        Ok(Self {
            package,
            shared_user_id: android_attribute(node, "sharedUserId"),
            shared_user_label: android_attribute(node, "sharedUserLabel"),
            version_code: android_attribute(node, "versionCode"),
            version_name: android_attribute(node, "versionName"),
            install_location: android_attribute(node, "installLocation"),
            permissions: collect_names(node.descendants(), TAG_PERMISSION),
            uses_features: collect_names(node.descendants(), TAG_USES_FEATURE),
            uses_permissions: collect_names(node.descendants(), TAG_USES_PERMISSION),
            uses_permissions_sdk_23: collect_names(node.descendants(), TAG_USES_PERMISSION_SDK_23),
            supports_gl_texture: collect_names(node.descendants(), TAG_SUPPORTS_GL_TEXTURE),
            uses_sdk: first_child(node, TAG_USES_SDK).map(UsesSdk::from_node),
            supports_screens: first_child(node, TAG_SUPPORTS_SCREENS).map(SupportsScreens::from_node),
            compatible_screens: first_child(node, TAG_COMPATIBLE_SCREENS)
                .map(CompatibleScreens::from_node),
            application,
            has_uses_configuration: first_child(node, TAG_USES_CONFIGURATION).is_some(),
        })
    }

    /// Compare `self` (previous build) against `other` (current build)
    pub fn diff(&self, other: &Self) -> ManifestDiff {
        let mut diff = ManifestDiff::default();

        self.diff_into(other, &mut diff.lines);

        compare_optional(TAG_USES_SDK, self.uses_sdk.as_ref(), other.uses_sdk.as_ref(), &mut diff);

        // Keyed on the current build's <uses-sdk>, not on <uses-configuration>
        // presence. Kept as the reports have always shown it until the
        // intended trigger is confirmed.
        if other.uses_sdk.is_none() {
            diff.manual_checks.push(TAG_USES_CONFIGURATION);
        }

        compare_optional(
            TAG_COMPATIBLE_SCREENS,
            self.compatible_screens.as_ref(),
            other.compatible_screens.as_ref(),
            &mut diff,
        );
        compare_optional(
            TAG_SUPPORTS_SCREENS,
            self.supports_screens.as_ref(),
            other.supports_screens.as_ref(),
            &mut diff,
        );

        self.application.diff_into(&other.application, &mut diff.lines);

        diff
    }
}

/// Result of comparing two manifests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestDiff {
    /// Report lines, in the fixed section order
    pub lines: Vec<String>,

    /// Sections present in only one of the manifests (plus the
    /// uses-configuration flag), in detection order
    pub manual_checks: Vec<&'static str>,
}

impl ManifestDiff {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.manual_checks.is_empty()
    }
}

impl fmt::Display for ManifestDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out: Vec<String> = self.lines.clone();
        if !self.manual_checks.is_empty() {
            out.push("Manually check these sections:".to_string());
            out.extend(self.manual_checks.iter().map(|tag| format!("    {tag}")));
        }
        f.write_str(&out.join("\n"))
    }
}

/// Compare two raw manifests. A missing or empty manifest yields one of the
/// fixed sentinel messages instead of a diff; neither side is parsed then.
pub fn compare_manifests(previous: Option<&str>, current: Option<&str>) -> Result<String, ParseError> {
    let previous = previous.filter(|xml| !xml.is_empty());
    let current = current.filter(|xml| !xml.is_empty());

    let (previous, current) = match (previous, current) {
        (Some(previous), Some(current)) => (previous, current),
        (None, None) => return Ok(NO_MANIFESTS.to_string()),
        (None, Some(_)) => return Ok(NO_PREVIOUS_MANIFEST.to_string()),
        (Some(_), None) => return Ok(NO_CURRENT_MANIFEST.to_string()),
    };

    let lhs = ManifestDocument::parse(previous)?;
    let rhs = ManifestDocument::parse(current)?;
    log::debug!(
        "Comparing manifests of {} ({}) and {} ({})",
        lhs.package,
        lhs.version_name.as_deref().unwrap_or("?"),
        rhs.package,
        rhs.version_name.as_deref().unwrap_or("?")
    );

    let diff = lhs.diff(&rhs);
    log::debug!(
        "Manifest diff: {} lines, {} sections to check manually",
        diff.lines.len(),
        diff.manual_checks.len()
    );

    Ok(diff.to_string())
}
