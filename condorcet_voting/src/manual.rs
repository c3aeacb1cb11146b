/*!

This is the long-form manual for `condorcet_voting` and `lunchvote`.

## Tabulation

Every ballot ranks some of the nominations, most preferred first. For every pair of
nominations `A` and `B`, a ballot prefers `A` over `B` when:
* both are ranked and `A` comes first, or
* `A` is ranked and `B` is not.

When neither is ranked, the ballot says nothing about this pair. The resulting head-to-head
counts form the pairwise matrix:

|       | A | B | C |
|-------|---|---|---|
| **A** |   | 3 | 3 |
| **B** | 0 |   | 3 |
| **C** | 0 | 0 |   |

(rows are "for", columns are "against": here 3 voters prefer `A` over `B`).

A nomination that beats every other one strictly is the Condorcet winner. There is at most one.
When there is none (for example when `A` beats `B`, `B` beats `C` and `C` beats `A`), the
nominations are ordered by:
1. number of opponents beaten, highest first,
2. support (sum of the row in the matrix), highest first,
3. creation time, earliest first,
4. id, in lexicographic order.

The first one wins. A single nomination wins without any vote and no nominations means no
winner.

## Election files

`lunchvote` stores each election as a JSON file named after its id:

```text
{
  "id": "5a2c0c0e-...",
  "name": "Friday lunch",
  "groupCodeword": "pickles",
  "adminName": "Anna",
  "ballotVisibility": "open",
  "voteStartTime": 1697630400000,
  "participants": ["Anna", "Bob"],
  "nominations": [
    {
      "id": "0e6f...",
      "nominatorName": "Bob",
      "restaurantName": "Taco Shack",
      "isWriteIn": false,
      "createdAt": 1697629000000
    }
  ],
  "votes": [
    { "voterName": "Anna", "rankings": ["0e6f..."] }
  ],
  "createdAt": 1697628000000
}
```

Optional fields: `state` (`voting`, `completed` or `cancelled`) forces the status of the
election, `winner` caches the id of the winning nomination and `metadata` in a nomination holds
any JSON value.

The status of an election is derived from the clock:
* before `voteStartTime`: nominations are open,
* during the voting window (10 minutes by default): votes are accepted,
* afterwards: completed.

An explicit `state` takes precedence: `cancelled` and `completed` are final, `voting` keeps the
election in the voting phase until its window closes, even if `voteStartTime` was moved.

## Spreadsheet ballots

`lunchvote import-ballots` reads ballots from an Excel (.xlsx) file:

| voter | choice 1   | choice 2 | ... |
|-------|------------|----------|-----|
| Anna  | Taco Shack | Pho Real |     |
| Bob   | Pho Real   |          |     |

The first row is a header and is skipped. Choices are matched against the nomination ids, then
against the restaurant names (ignoring case). Empty cells are skipped.

## Configuration

`lunchvote` accepts a configuration file in JSON with the `--config` flag:

```text
{
  "storeDirectory": "/var/lib/lunchvote",
  "votingWindowMinutes": 15
}
```

Both fields are optional. The `--store` flag overrides `storeDirectory`.

## Tabulating a file

`lunchvote tally --input ballots.json` counts a file holding `nominations` and `votes` in the
format above, without any lifecycle. With `--reference expected.json`, the output is compared
with a previous output and the differences are printed.

 */
