//! Declarative element descriptions.
//!
//! An [`Element`] is a type discriminator plus a shared [`Props`] bag. Props are
//! reference counted so the work loop can tell an untouched subtree apart from
//! a freshly built one with [`Rc::ptr_eq`].

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::ComponentError;
use crate::hooks::RenderContext;
use crate::NodeId;

/// Attribute holding the content of a text element.
pub const NODE_VALUE: &str = "nodeValue";

/// Attribute holding the nested style map.
pub const STYLE: &str = "style";

/// Nested style properties, diffed key by key on commit.
pub type StyleMap = IndexMap<String, String>;

type RenderFn = dyn Fn(&Props, &mut RenderContext<'_>) -> Result<Vec<Element>, ComponentError>;

struct ComponentDef {
    name: &'static str,
    render: Box<RenderFn>,
}

/// Handle to a component function.
///
/// Two refs are the same component only if they were cloned from the same
/// handle, so a component should be constructed once and shared (the
/// `#[component]` macro does this with a thread-local).
#[derive(Clone)]
pub struct ComponentRef {
    inner: Rc<ComponentDef>,
}

impl ComponentRef {
    pub fn new<C, F>(name: &'static str, render: F) -> Self
    where
        C: IntoChildren,
        F: Fn(&Props, &mut RenderContext<'_>) -> C + 'static,
    {
        Self::fallible(name, move |props: &Props, cx: &mut RenderContext<'_>| {
            Ok::<C, ComponentError>(render(props, cx))
        })
    }

    /// Build a component whose body may fail. The failure aborts the render
    /// pass that evaluated it.
    pub fn fallible<C, F>(name: &'static str, render: F) -> Self
    where
        C: IntoChildren,
        F: Fn(&Props, &mut RenderContext<'_>) -> Result<C, ComponentError> + 'static,
    {
        let render: Box<RenderFn> = Box::new(move |props: &Props, cx: &mut RenderContext<'_>| {
            render(props, cx).map(IntoChildren::into_children)
        });
        Self {
            inner: Rc::new(ComponentDef { name, render }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub(crate) fn render(
        &self,
        props: &Props,
        cx: &mut RenderContext<'_>,
    ) -> Result<Vec<Element>, ComponentError> {
        (self.inner.render)(props, cx)
    }
}

impl PartialEq for ComponentRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for ComponentRef {}

impl fmt::Debug for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ComponentRef").field(&self.inner.name).finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ElementType {
    /// A primitive host-tree element such as `div`.
    Host(Rc<str>),
    Text,
    Component(ComponentRef),
}

impl From<&str> for ElementType {
    fn from(tag: &str) -> Self {
        ElementType::Host(Rc::from(tag))
    }
}

impl From<String> for ElementType {
    fn from(tag: String) -> Self {
        ElementType::Host(Rc::from(tag))
    }
}

impl From<ComponentRef> for ElementType {
    fn from(component: ComponentRef) -> Self {
        ElementType::Component(component)
    }
}

impl From<&ComponentRef> for ElementType {
    fn from(component: &ComponentRef) -> Self {
        ElementType::Component(component.clone())
    }
}

/// Event delivered by the host to a registered handler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostEvent {
    pub event_type: String,
    pub target: NodeId,
}

/// Event listener stored in a property bag. Equality is identity.
#[derive(Clone)]
pub struct EventHandler(Rc<dyn Fn(&HostEvent)>);

impl EventHandler {
    pub fn new(handler: impl Fn(&HostEvent) + 'static) -> Self {
        Self(Rc::new(handler))
    }

    pub fn call(&self, event: &HostEvent) {
        (self.0)(event);
    }
}

impl PartialEq for EventHandler {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventHandler({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PropValue {
    Str(Rc<str>),
    Int(i64),
    Float(f64),
    Bool(bool),
    Style(StyleMap),
    Handler(EventHandler),
}

impl PropValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_handler(&self) -> Option<&EventHandler> {
        match self {
            PropValue::Handler(handler) => Some(handler),
            _ => None,
        }
    }

    pub fn as_style(&self) -> Option<&StyleMap> {
        match self {
            PropValue::Style(style) => Some(style),
            _ => None,
        }
    }
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Str(value) => f.write_str(value),
            PropValue::Int(value) => write!(f, "{value}"),
            PropValue::Float(value) => write!(f, "{value}"),
            PropValue::Bool(value) => write!(f, "{value}"),
            PropValue::Style(style) => {
                for (key, value) in style {
                    write!(f, "{key}: {value};")?;
                }
                Ok(())
            }
            PropValue::Handler(_) => f.write_str("[handler]"),
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(Rc::from(value))
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(Rc::from(value))
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Int(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Int(i64::from(value))
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Float(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<StyleMap> for PropValue {
    fn from(value: StyleMap) -> Self {
        PropValue::Style(value)
    }
}

impl From<EventHandler> for PropValue {
    fn from(value: EventHandler) -> Self {
        PropValue::Handler(value)
    }
}

/// Property bag of an element: ordered attributes plus the child list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Props {
    attrs: IndexMap<String, PropValue>,
    children: Vec<Element>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Register `handler` under `name`, which should carry the `on` prefix.
    pub fn on(self, name: impl Into<String>, handler: impl Fn(&HostEvent) + 'static) -> Self {
        self.with(name, EventHandler::new(handler))
    }

    pub fn with_children(mut self, children: impl IntoChildren) -> Self {
        self.children = children.into_children();
        self
    }

    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.attrs.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(PropValue::as_str)
    }

    pub fn style(&self) -> Option<&StyleMap> {
        self.get(STYLE).and_then(PropValue::as_style)
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.attrs.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    ty: ElementType,
    props: Rc<Props>,
}

impl Element {
    pub fn new(ty: impl Into<ElementType>, props: Props) -> Self {
        Self {
            ty: ty.into(),
            props: Rc::new(props),
        }
    }

    pub fn ty(&self) -> &ElementType {
        &self.ty
    }

    pub fn props(&self) -> &Rc<Props> {
        &self.props
    }

    pub fn children(&self) -> &[Element] {
        self.props.children()
    }
}

/// Build an element from a type, a property bag and its children.
///
/// Primitive children become text elements; `None` and `false` are dropped.
pub fn h(ty: impl Into<ElementType>, props: Props, children: impl IntoChildren) -> Element {
    Element::new(ty, props.with_children(children))
}

pub fn text(value: impl fmt::Display) -> Element {
    Element::new(
        ElementType::Text,
        Props::new().with(NODE_VALUE, value.to_string()),
    )
}

/// One entry of a heterogeneous child list.
#[derive(Clone, Debug, PartialEq)]
pub enum Child {
    Element(Element),
    Many(Vec<Element>),
    Text(String),
    Skip,
}

impl From<Element> for Child {
    fn from(element: Element) -> Self {
        Child::Element(element)
    }
}

impl From<Vec<Element>> for Child {
    fn from(elements: Vec<Element>) -> Self {
        Child::Many(elements)
    }
}

impl From<&str> for Child {
    fn from(value: &str) -> Self {
        Child::Text(value.to_owned())
    }
}

impl From<String> for Child {
    fn from(value: String) -> Self {
        Child::Text(value)
    }
}

impl From<i64> for Child {
    fn from(value: i64) -> Self {
        Child::Text(value.to_string())
    }
}

impl From<i32> for Child {
    fn from(value: i32) -> Self {
        Child::Text(value.to_string())
    }
}

impl From<bool> for Child {
    fn from(value: bool) -> Self {
        if value {
            Child::Text(value.to_string())
        } else {
            Child::Skip
        }
    }
}

impl<T: Into<Child>> From<Option<T>> for Child {
    fn from(value: Option<T>) -> Self {
        value.map_or(Child::Skip, Into::into)
    }
}

/// Normalization of everything that can stand in a child position.
pub trait IntoChildren {
    fn into_children(self) -> Vec<Element>;
}

impl IntoChildren for Child {
    fn into_children(self) -> Vec<Element> {
        match self {
            Child::Element(element) => vec![element],
            Child::Many(elements) => elements,
            Child::Text(value) => vec![text(value)],
            Child::Skip => Vec::new(),
        }
    }
}

impl IntoChildren for Element {
    fn into_children(self) -> Vec<Element> {
        vec![self]
    }
}

impl IntoChildren for () {
    fn into_children(self) -> Vec<Element> {
        Vec::new()
    }
}

impl IntoChildren for &str {
    fn into_children(self) -> Vec<Element> {
        vec![text(self)]
    }
}

impl IntoChildren for String {
    fn into_children(self) -> Vec<Element> {
        vec![text(self)]
    }
}

impl<T: IntoChildren> IntoChildren for Option<T> {
    fn into_children(self) -> Vec<Element> {
        self.map(IntoChildren::into_children).unwrap_or_default()
    }
}

impl<T: Into<Child>> IntoChildren for Vec<T> {
    fn into_children(self) -> Vec<Element> {
        self.into_iter()
            .flat_map(|child| child.into().into_children())
            .collect()
    }
}

impl<T: Into<Child>, const N: usize> IntoChildren for [T; N] {
    fn into_children(self) -> Vec<Element> {
        self.into_iter()
            .flat_map(|child| child.into().into_children())
            .collect()
    }
}

/// Build a mixed child list, e.g. `children![h("b", Props::new(), ()), "tail", None::<Element>]`.
#[macro_export]
macro_rules! children {
    ($($child:expr),* $(,)?) => {
        ::std::vec![$($crate::Child::from($child)),*]
    };
}

#[cfg(test)]
#[path = "tests/element_tests.rs"]
mod tests;
