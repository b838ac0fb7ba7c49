//! Workflow sub-forms: short linear forms that commit one change to one record.
//!
//! A form is either closed or open. Opening an edit form captures the target id and seeds
//! a draft from the record's current values; opening a create form starts from an empty
//! draft. Commit validates the whole draft first and only then writes, so a failed commit
//! leaves the store untouched and the form open with its field errors.

pub mod close;
pub mod create;
pub mod reschedule;

use crate::controller::ListController;
use crate::error::{CabinetError, CabinetResult};
use crate::record::Record;
use crate::store::RecordStore;

/// A validation failure attached to one form field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Open/closed flag, target, draft and step position of one form.
#[derive(Clone, Debug, PartialEq)]
pub struct FormState<Id, D> {
    open: bool,
    target: Option<Id>,
    draft: D,
    step: usize,
    steps: usize,
    errors: Vec<FieldError>,
}

impl<Id: Clone, D: Default> FormState<Id, D> {
    pub fn new(steps: usize) -> Self {
        Self {
            open: false,
            target: None,
            draft: D::default(),
            step: 0,
            steps: steps.max(1),
            errors: Vec::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn target(&self) -> Option<&Id> {
        self.target.as_ref()
    }

    pub fn draft(&self) -> &D {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut D {
        &mut self.draft
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn is_last_step(&self) -> bool {
        self.step + 1 == self.steps
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Advances one step. Returns `false` on the last step or when the form is closed.
    pub fn next_step(&mut self) -> bool {
        if !self.open || self.is_last_step() {
            return false;
        }
        self.step += 1;
        true
    }

    pub fn previous_step(&mut self) -> bool {
        if self.step == 0 {
            return false;
        }
        self.step -= 1;
        true
    }

    /// Closes the form and discards the draft.
    pub fn cancel(&mut self) {
        self.open = false;
        self.target = None;
        self.draft = D::default();
        self.step = 0;
        self.errors.clear();
    }

    fn open_with(&mut self, target: Option<Id>, draft: D) {
        self.open = true;
        self.target = target;
        self.draft = draft;
        self.step = 0;
        self.errors.clear();
    }

    fn record_failure(&mut self, err: &CabinetError) {
        self.errors.clear();
        if let CabinetError::Validation { field, message } = err {
            self.errors.push(FieldError {
                field: *field,
                message: message.clone(),
            });
        }
    }
}

/// A form that edits one existing record.
pub trait EditWorkflow<R: Record> {
    /// Local form fields.
    type Draft: Clone + Default;
    /// What a validated draft turns into.
    type Change;

    fn steps(&self) -> usize {
        1
    }

    /// Initial draft from the record's current values.
    fn seed(&self, record: &R) -> Self::Draft;

    /// Validates the draft against the record. Must not have side effects.
    fn validate(&self, draft: &Self::Draft, record: &R) -> CabinetResult<Self::Change>;

    /// Writes a validated change into the record.
    fn apply(&self, change: Self::Change, record: &mut R);
}

/// A form that creates a new record.
pub trait CreateWorkflow<R: Record> {
    type Draft: Clone + Default;

    fn steps(&self) -> usize {
        1
    }

    /// An id not used by any record in `store`.
    fn next_id(&self, store: &RecordStore<R>) -> R::Id;

    /// Validates the draft and builds the record with `id`.
    fn build(&self, draft: &Self::Draft, id: R::Id) -> CabinetResult<R>;
}

/// An edit workflow together with its form state.
pub struct EditForm<R: Record, W: EditWorkflow<R>> {
    workflow: W,
    state: FormState<R::Id, W::Draft>,
}

impl<R: Record, W: EditWorkflow<R>> EditForm<R, W> {
    pub fn new(workflow: W) -> Self {
        let state = FormState::new(workflow.steps());
        Self { workflow, state }
    }

    pub fn workflow(&self) -> &W {
        &self.workflow
    }

    pub fn state(&self) -> &FormState<R::Id, W::Draft> {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut FormState<R::Id, W::Draft> {
        &mut self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    pub fn draft_mut(&mut self) -> &mut W::Draft {
        self.state.draft_mut()
    }

    /// Opens the form on `id`, seeding the draft from the record.
    pub fn open(&mut self, controller: &ListController<R>, id: &R::Id) -> CabinetResult<()> {
        let record = controller.record(id)?;
        let draft = self.workflow.seed(record);
        self.state.open_with(Some(id.clone()), draft);
        Ok(())
    }

    pub fn cancel(&mut self) {
        self.state.cancel();
    }

    /// Validates and writes the draft.
    ///
    /// On validation failure the form stays open with its field errors and the record is
    /// untouched. If the target record is gone the form closes.
    pub fn commit(&mut self, controller: &mut ListController<R>) -> CabinetResult<R::Id> {
        if !self.state.is_open() {
            return Err(CabinetError::WorkflowClosed);
        }
        let id = self.state.target().cloned().ok_or(CabinetError::WorkflowClosed)?;

        let record = match controller.record(&id) {
            Ok(record) => record,
            Err(e) => {
                self.state.cancel();
                return Err(e);
            }
        };

        let change = match self.workflow.validate(self.state.draft(), record) {
            Ok(change) => change,
            Err(e) => {
                self.state.record_failure(&e);
                return Err(e);
            }
        };

        let workflow = &self.workflow;
        controller.update_with(&id, |r| workflow.apply(change, r))?;
        self.state.cancel();
        Ok(id)
    }
}

/// A create workflow together with its form state.
pub struct CreateForm<R: Record, W: CreateWorkflow<R>> {
    workflow: W,
    state: FormState<(), W::Draft>,
}

impl<R: Record, W: CreateWorkflow<R>> CreateForm<R, W> {
    pub fn new(workflow: W) -> Self {
        let state = FormState::new(workflow.steps());
        Self { workflow, state }
    }

    pub fn state(&self) -> &FormState<(), W::Draft> {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut FormState<(), W::Draft> {
        &mut self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    pub fn draft_mut(&mut self) -> &mut W::Draft {
        self.state.draft_mut()
    }

    /// Opens with an empty draft.
    pub fn open(&mut self) {
        self.state.open_with(None, W::Draft::default());
    }

    /// Opens with a pre-filled draft.
    pub fn open_with(&mut self, draft: W::Draft) {
        self.state.open_with(None, draft);
    }

    pub fn cancel(&mut self) {
        self.state.cancel();
    }

    /// Validates the draft, assigns a fresh id and appends the new record.
    pub fn commit(&mut self, controller: &mut ListController<R>) -> CabinetResult<R::Id> {
        if !self.state.is_open() {
            return Err(CabinetError::WorkflowClosed);
        }

        let id = self.workflow.next_id(controller.store());
        let record = match self.workflow.build(self.state.draft(), id.clone()) {
            Ok(record) => record,
            Err(e) => {
                self.state.record_failure(&e);
                return Err(e);
            }
        };

        controller.append(record)?;
        self.state.cancel();
        Ok(id)
    }
}
