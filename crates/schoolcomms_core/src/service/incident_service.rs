//! Incident reporting and moderation use-cases.
//!
//! # Invariants
//! - New reports start `pending`.
//! - Only staff change state arbitrarily; owners may only resolve.

use super::{record_audit, Actor, ServiceError, ServiceResult};
use crate::model::incident::{
    Incident, IncidentBoard, IncidentCategory, IncidentId, IncidentState,
};
use crate::model::now_ms;
use crate::repo::audit_repo::AuditRepository;
use crate::repo::incident_repo::IncidentRepository;
use log::info;
use serde_json::json;

pub struct IncidentService<R: IncidentRepository, A: AuditRepository> {
    repo: R,
    audit: A,
}

impl<R: IncidentRepository, A: AuditRepository> IncidentService<R, A> {
    pub fn new(repo: R, audit: A) -> Self {
        Self { repo, audit }
    }

    pub fn report(
        &self,
        actor: Actor,
        title: impl Into<String>,
        description: impl Into<String>,
        category: IncidentCategory,
    ) -> ServiceResult<Incident> {
        let incident = Incident::new(actor.user, title, description, category);
        self.repo.create_incident(&incident)?;
        record_audit(
            &self.audit,
            actor,
            "incident.report",
            json!({ "incident": incident.uuid, "category": incident.category.as_str() }),
        );
        info!(
            "event=incident_report module=service status=ok category={}",
            incident.category.as_str()
        );
        Ok(incident)
    }

    /// The actor's own reports grouped by state.
    pub fn own_board(&self, actor: Actor) -> ServiceResult<IncidentBoard> {
        Ok(IncidentBoard::from_incidents(
            self.repo.list(Some(actor.user), None)?,
        ))
    }

    /// Every report grouped by state; staff only.
    pub fn staff_board(&self, actor: Actor) -> ServiceResult<IncidentBoard> {
        actor.require_staff("open the incident panel")?;
        Ok(IncidentBoard::from_incidents(self.repo.list(None, None)?))
    }

    /// Flat list of every report, newest first; staff only.
    pub fn moderator_list(&self, actor: Actor) -> ServiceResult<Vec<Incident>> {
        actor.require_staff("moderate incidents")?;
        Ok(self.repo.list(None, None)?)
    }

    pub fn change_state(
        &self,
        actor: Actor,
        id: IncidentId,
        state: IncidentState,
    ) -> ServiceResult<Incident> {
        actor.require_staff("change incident state")?;
        self.transition(actor, id, state)
    }

    /// Resolves the incident; allowed for its author and for staff.
    pub fn mark_resolved(&self, actor: Actor, id: IncidentId) -> ServiceResult<Incident> {
        let incident = self
            .repo
            .get_incident(id)?
            .ok_or(ServiceError::NotFound(id))?;
        actor.require_manage(incident.author, "resolve this incident")?;
        self.transition(actor, id, IncidentState::Resolved)
    }

    fn transition(
        &self,
        actor: Actor,
        id: IncidentId,
        state: IncidentState,
    ) -> ServiceResult<Incident> {
        self.repo.set_state(id, state, now_ms())?;
        record_audit(
            &self.audit,
            actor,
            "incident.state",
            json!({ "incident": id, "state": state.as_str() }),
        );
        self.repo
            .get_incident(id)?
            .ok_or(ServiceError::NotFound(id))
    }
}
