use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use derive_new::new;

/// A path whose versions could not be reconciled
///
/// Absent versions are recorded as the null id: a null ancestor means both sides added the
/// path, a null side means that side removed it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, new)]
pub struct Conflict {
    path: String,
    ancestor: ObjectId,
    ours: ObjectId,
    theirs: ObjectId,
}

impl Conflict {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn ancestor(&self) -> &ObjectId {
        &self.ancestor
    }

    pub fn ours(&self) -> &ObjectId {
        &self.ours
    }

    pub fn theirs(&self) -> &ObjectId {
        &self.theirs
    }

    /// One tab-separated line: `path ancestor ours theirs`
    pub fn to_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}",
            self.path, self.ancestor, self.ours, self.theirs
        )
    }

    pub fn try_parse(line: &str) -> anyhow::Result<Self> {
        let mut fields = line.rsplitn(4, '\t');
        let theirs = fields.next().context("Invalid conflict line: missing theirs")?;
        let ours = fields.next().context("Invalid conflict line: missing ours")?;
        let ancestor = fields
            .next()
            .context("Invalid conflict line: missing ancestor")?;
        let path = fields.next().context("Invalid conflict line: missing path")?;

        Ok(Self::new(
            path.to_string(),
            ObjectId::try_parse(ancestor.to_string())?,
            ObjectId::try_parse(ours.to_string())?,
            ObjectId::try_parse(theirs.to_string())?,
        ))
    }
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_line())
    }
}
