/*!

This is the long-form manual for `equal_shares` and `eqshares`.

## Input format

The instances are read from PaBuLib-style files: plain text, semicolon
separated, split into sections. A section starts with a line holding only its
name (`META`, `PROJECTS`, `VOTES`, `GROUPS` or `GROUP_VOTES`, in any case).
The first line after the name is the header of the section.

```text
META
key;value
budget;1000
vote_type;approval
PROJECTS
project_id;cost;name
p1;600;Park
p2;500;Library
VOTES
voter_id;project_id;score
alice;p1;1
alice;p2;1
bob;p2;1
```

### `META`

Pairs of `key;value`. The `budget` key is required and must be a number.
A warning is printed if `vote_type` is missing or is not `approval`.

### `PROJECTS`

Requires the `project_id` and `cost` columns. Other columns such as `name`
are optional.

### `VOTES`

Requires the `voter_id`, `project_id` and `score` columns, one row per
voter and project. A voter approves a project when its score is positive. A
later row for the same voter and project replaces the score.

Files without a `project_id` column may instead list the approved projects of
each voter in a `vote` column, separated by commas.

### `GROUPS` and `GROUP_VOTES`

Optional. `GROUPS` requires `group_id` and a numeric `weight`. Negative
weights count as zero. `GROUP_VOTES` requires `group_id`, `project_id` and a
numeric `score`; the group and the project must be declared before.
When a file declares groups, the weighted groups method is used unless a
method was configured explicitly.

All the errors of the parser carry the line number of the offending line.

## Methods

### `standard`

The method of equal shares with a fixed budget: every voter receives an
equal share of the budget, and projects are funded one by one by their
approvers, picking at each round the project whose cost can be split the most
evenly (the largest effective vote count).

### `weightedGroups`

A share `groupIndiRatio` of the budget is given to the groups, in proportion
of their weights, and the rest is split equally between the individual voters.
Each supporter spreads its money over the projects in proportion of its
scores. The project with the largest support is funded at each round.

## Parameters

They are read from a JSON configuration file (`--config`) and can be
overridden on the command line with `--set key=value`. All the fields are
optional.

* `totalBudget` overrides the budget of the instance when positive
* `groupIndiRatio` the share of the budget for the groups (default 0.5)
* `method` `standard` or `weightedGroups`
* `completion` what to do with the leftover budget:
  - `none`
  - `utilitarian` add the most approved projects that still fit
  - `add1` raise the virtual budget one unit per voter while the result fits
  - `add1e` like `add1`, stopping as soon as no other project fits
  - `add1u` (default) `add1` followed by `utilitarian`
  - `add1eu` `add1e` followed by `utilitarian`
* `add1options` a list of `exhaustive` and `integral` (both by default)
* `comparison` `none` (default), `satisfaction` or `exclusionRatio`: the result
  is replaced by the greedy one if more voters prefer it
* `accuracy` `floats` (default) or `fractions` for exact arithmetic
* `tieBreaking` a list of `maxVotes`, `minCost`, `maxCost` or lists of project
  ids in order of preference
* `weightedTieBreak` `firstFound` (default) or `resolver` to apply
  `tieBreaking` in the weighted mode

On the command line, the lists are separated by commas and a priority list is
written with `|` between the project ids:

```text
eqshares --input zurich.pb --set completion=add1e --set tieBreaking=maxVotes,p3|p1
```

## Output

The result is a JSON object `{"type": "result", "winners": [...], "notes": {...}}`.
The notes of the standard method hold the diagnostics of the final run
(`endowment`, `moneyBehindCandidate`, `effectiveVoteCount`), the projects
`addedByUtilitarianCompletion`, the `comparison` message when the greedy
outcome won, and the statistics of the result and of the greedy outcome
(`stats`, `greedyStats`). The notes of the weighted method hold the initial
and leftover money of every group and voter, what they spent on each project
and a `spendSummary`.

*/
