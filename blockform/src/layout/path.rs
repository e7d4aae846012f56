use std::fmt;

/// Which list of a group a node lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Area {
    Children,
    Settings,
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Area::Children => write!(f, "children"),
            Area::Settings => write!(f, "settings"),
        }
    }
}

/// One step from a group into one of its nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    pub area: Area,
    pub index: usize,
    /// Heading of the node entered, when it is a group that has one.
    pub heading: Option<String>,
}

/// Location of a node in a layout, from the root group.
/// Displayed as `root > children[1] "Basic info" > settings[0]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodePath {
    pub steps: Vec<PathStep>,
}

impl NodePath {
    pub fn root() -> Self {
        Self::default()
    }

    /// The path of a node one level down.
    pub fn join(&self, area: Area, index: usize, heading: Option<&str>) -> NodePath {
        let mut steps = self.steps.clone();
        steps.push(PathStep {
            area,
            index,
            heading: heading.map(str::to_string),
        });
        NodePath { steps }
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "root")?;
        for step in &self.steps {
            write!(f, " > {}[{}]", step.area, step.index)?;
            if let Some(heading) = &step.heading {
                write!(f, " \"{}\"", heading)?;
            }
        }
        Ok(())
    }
}

/// Address of a group for layout edits: indices into `children` or `settings`
/// from the root. The empty path is the root group itself.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GroupPath {
    pub steps: Vec<(Area, usize)>,
}

impl GroupPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(mut self, index: usize) -> Self {
        self.steps.push((Area::Children, index));
        self
    }

    pub fn setting(mut self, index: usize) -> Self {
        self.steps.push((Area::Settings, index));
        self
    }
}

impl fmt::Display for GroupPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "root")?;
        for (area, index) in &self.steps {
            write!(f, ".{}[{}]", area, index)?;
        }
        Ok(())
    }
}
